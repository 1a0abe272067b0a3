use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::content::{ContentManager, Hazard, StatusType};
use crate::geometry::Vec2;
use crate::mob::MobType;
use crate::world::{AreaGeometry, Tilemap};

use super::context::{MobStore, ScriptContext, SimServices};

const WIDTH: u32 = 20;
const HEIGHT: u32 = 20;
const TILE_SIZE: f32 = 32.0;
const FIRST_HAZARD_TILE: u16 = 10;

/// Open 20x20 floor of 32-unit tiles with an empty mob store and no content
/// on disk.
pub(crate) struct TestWorld {
    pub mobs: MobStore,
    pub geometry: AreaGeometry,
    pub services: SimServices,
    pub content: ContentManager,
    tiles: Vec<u16>,
    tile_hazards: BTreeMap<u16, String>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            mobs: MobStore::default(),
            geometry: AreaGeometry::flat(WIDTH, HEIGHT, TILE_SIZE).expect("geometry"),
            services: SimServices::new(7),
            content: ContentManager::new(PathBuf::from("test_game_data")),
            tiles: vec![0; (WIDTH * HEIGHT) as usize],
            tile_hazards: BTreeMap::new(),
        }
    }

    pub fn ctx(&mut self) -> ScriptContext<'_> {
        ScriptContext {
            mobs: &mut self.mobs,
            geometry: &self.geometry,
            services: &mut self.services,
            content: &self.content,
        }
    }

    pub fn add_status_type(&mut self, name: &str) {
        self.content.insert_status_type(StatusType::named(name));
    }

    pub fn add_hazard(&mut self, name: &str, effects: &[&str]) {
        self.content.insert_hazard(Hazard {
            name: name.to_string(),
            display_name: name.to_string(),
            effects: effects.iter().map(|effect| effect.to_string()).collect(),
            liquid: None,
        });
    }

    pub fn add_mob_type(&mut self, mob_type: MobType) -> Arc<MobType> {
        self.content.insert_mob_type(mob_type)
    }

    /// Marks one tile with a hazard and rebuilds the geometry.
    pub fn set_hazard_tile(&mut self, x: u32, y: u32, hazard: &str) {
        let tile_id = match self
            .tile_hazards
            .iter()
            .find(|(_, name)| name.as_str() == hazard)
        {
            Some((id, _)) => *id,
            None => {
                let id = FIRST_HAZARD_TILE + self.tile_hazards.len() as u16;
                self.tile_hazards.insert(id, hazard.to_string());
                id
            }
        };
        self.tiles[(y * WIDTH + x) as usize] = tile_id;
        let tilemap =
            Tilemap::new(WIDTH, HEIGHT, Vec2::ZERO, self.tiles.clone()).expect("tilemap");
        self.geometry = AreaGeometry::new(tilemap, TILE_SIZE, None, self.tile_hazards.clone())
            .expect("geometry");
    }
}

/// Writes `relative` inside `<game_data>/<pack>/`, creating folders.
pub(crate) fn write_pack_file(game_data: &Path, pack: &str, relative: &str, content: &str) {
    let path = game_data.join(pack).join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write");
}

const BULBORB_DATA: &str = r#"<MobType>
    <name>Red Bulborb</name>
    <maxHealth>750</maxHealth>
    <moveSpeed>60</moveSpeed>
    <team>enemy_1</team>
    <pikminSeeds>10</pikminSeeds>
    <points>25</points>
    <reaches><reach name="search" radius1="160" angle1="120"/></reaches>
    <animations>
        <animation name="idling" duration="2"/>
        <animation name="walking" duration="1"/>
    </animations>
    <sounds><sound name="roar" sample="bulborb_roar"/></sounds>
</MobType>"#;

const BULBORB_SCRIPT: &str = r#"<MobScript>
    <firstState>idling</firstState>
    <script>
        <state name="idling">
            <event name="on_enter">
                set_animation idling
                calculate entered $entered + 1
            </event>
            <event name="on_reach_destination">
                set_state moving
            </event>
            <event name="on_receive_message">
                delete
            </event>
        </state>
        <state name="moving">
            <event name="on_enter">
                set_animation walking
                play_sound roar
            </event>
        </state>
    </script>
</MobScript>"#;

const TEST_FIELD: &str = r#"<Area>
    <name>Test Field</name>
    <dayStartMinutes>420</dayStartMinutes>
    <daySpeed>30</daySpeed>
    <tiles width="10" height="10" tileSize="32">
        <row>0 0 0 0 0 0 0 0 0 0</row>
        <row>0 0 0 0 0 0 0 0 0 0</row>
        <row>0 0 0 0 0 0 0 0 0 0</row>
        <row>0 0 0 0 0 0 0 0 0 0</row>
        <row>0 0 0 0 0 0 0 0 0 0</row>
        <row>0 0 0 0 0 0 0 0 0 0</row>
        <row>0 0 0 0 0 0 0 0 0 0</row>
        <row>0 0 0 0 0 0 0 0 0 0</row>
        <row>0 0 0 0 0 0 0 0 5 5</row>
        <row>0 0 0 0 0 0 0 0 5 5</row>
    </tiles>
    <tileHazards><hazard tile="5">water</hazard></tileHazards>
    <mobs>
        <mob type="enemies/red_bulborb" x="100" y="100" angle="90"/>
        <mob type="onions/red_onion" x="250" y="40"/>
        <mob type="pellets/red_1" x="60" y="250"/>
        <mob type="pikmin/red_pikmin" x="40" y="250"/>
    </mobs>
    <mission>
        <goal>battle_enemies</goal>
        <goalAllMobs>false</goalAllMobs>
        <goalMobs><mob>0</mob></goalMobs>
        <failConditions><timeLimit>30</timeLimit></failConditions>
        <grading mode="points">
            <pointsPerEnemyPoint>4</pointsPerEnemyPoint>
            <medals bronze="50" silver="100" gold="200" platinum="300"/>
        </grading>
    </mission>
</Area>"#;

/// A `base` pack with one item of every content type.
pub(crate) fn write_test_game_data(game_data: &Path) {
    let files = [
        ("pack.json", r#"{"name": "Base", "version": "1.0"}"#),
        ("liquids/water.xml", "<Liquid><color>40 80 200 160</color></Liquid>"),
        (
            "status_types/soaked.xml",
            "<StatusType><name>Soaked</name><speedMultiplier>0.5</speedMultiplier></StatusType>",
        ),
        (
            "hazards/water.xml",
            "<Hazard><effects><effect>soaked</effect></effects><liquid>water</liquid></Hazard>",
        ),
        ("samples/bulborb_roar.ogg", "OggS"),
        ("mob_types/enemies/red_bulborb/data.xml", BULBORB_DATA),
        ("mob_types/enemies/red_bulborb/script.xml", BULBORB_SCRIPT),
        (
            "mob_types/pikmin/red_pikmin/data.xml",
            "<MobType><name>Red Pikmin</name><team>player_1</team></MobType>",
        ),
        (
            "mob_types/onions/red_onion/data.xml",
            "<MobType><name>Red Onion</name><pikminTypes><type>pikmin/red_pikmin</type></pikminTypes></MobType>",
        ),
        (
            "mob_types/pellets/red_1/data.xml",
            "<MobType><pikminType>pikmin/red_pikmin</pikminType><weight>1</weight><maxCarriers>2</maxCarriers></MobType>",
        ),
        ("areas/test_field/area.xml", TEST_FIELD),
    ];
    for (relative, content) in files {
        write_pack_file(game_data, "base", relative, content);
    }
}
