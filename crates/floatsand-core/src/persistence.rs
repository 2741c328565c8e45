//! Save/Load functionality for persisting simulation state
//!
//! Uses bincode for binary serialization of the whole engine state. Humans
//! are stored as plain values and respawned into a fresh `hecs::World` on
//! load, since entity handles are not stable across worlds.

use floatsand_logic::config::NpcParameters;
use floatsand_logic::npc::{HumanNpc, NpcId};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::substrate::{NpcParticles, Ocean, ShipMesh};

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Simulation time in seconds
    pub sim_time: f32,
    pub sequence_number: u64,
    pub generalized_panic_level: f32,
    pub next_npc_id: NpcId,
    pub params: NpcParameters,
    pub particles: NpcParticles,
    pub ship: ShipMesh,
    pub ocean: Ocean,
    /// All humans, ordered by id
    pub humans: Vec<HumanNpc>,
}

/// Save the complete simulation to a writer
pub fn save_simulation<W: Write>(
    writer: W,
    sim_time: f32,
    sequence_number: u64,
    generalized_panic_level: f32,
    next_npc_id: NpcId,
    params: &NpcParameters,
    particles: &NpcParticles,
    ship: &ShipMesh,
    ocean: &Ocean,
    humans: Vec<HumanNpc>,
) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        sim_time,
        sequence_number,
        generalized_panic_level,
        next_npc_id,
        params: *params,
        particles: particles.clone(),
        ship: ship.clone(),
        ocean: *ocean,
        humans,
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a simulation from a reader
pub fn load_simulation<R: Read>(reader: R) -> Result<LoadedSimulation, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    Ok(LoadedSimulation {
        sim_time: save_data.sim_time,
        sequence_number: save_data.sequence_number,
        generalized_panic_level: save_data.generalized_panic_level,
        next_npc_id: save_data.next_npc_id,
        params: save_data.params,
        particles: save_data.particles,
        ship: save_data.ship,
        ocean: save_data.ocean,
        humans: save_data.humans,
    })
}

/// Result of loading a simulation
pub struct LoadedSimulation {
    pub sim_time: f32,
    pub sequence_number: u64,
    pub generalized_panic_level: f32,
    pub next_npc_id: NpcId,
    pub params: NpcParameters,
    pub particles: NpcParticles,
    pub ship: ShipMesh,
    pub ocean: Ocean,
    pub humans: Vec<HumanNpc>,
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(f, "Save version mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for SaveError {}
