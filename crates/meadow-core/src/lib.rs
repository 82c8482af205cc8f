//! Meadow Core - engine-free logic of the Meadow model viewer
//!
//! This crate holds everything that does not need a renderer:
//! - Bounding boxes, row arrangement and camera framing
//! - Session state with its default camera snapshot
//! - Ground-mesh heuristic and the lighting rig
//! - Import filtering and queueing, manifest parsing, status text
//! - Procedural grass texture and viewer configuration

pub mod arrange;
pub mod bounds;
pub mod config;
pub mod error;
pub mod framing;
pub mod ground;
pub mod import;
pub mod lighting;
pub mod manifest;
pub mod session;
pub mod status;
pub mod texture;

pub use arrange::{arrange_row, Placeable};
pub use bounds::Aabb3;
pub use config::ViewerConfig;
pub use error::{ImportError, ManifestError, NetworkError};
pub use framing::{frame_box, CameraState, FramingOptions};
pub use ground::{GroundFilter, MeshTreatment};
pub use import::{ImportOrigin, ImportQueue, ImportRequest, ImportSource};
pub use lighting::{LightRig, LightingControls};
pub use manifest::Manifest;
pub use session::{Framing, LoadedModel, SessionState};
pub use status::{StatusLine, StatusMessage};
pub use texture::GrassTexture;
