//! Device inspection
//!
//! - `backend`: the device backend client (hierarchy, device info, step and script runs)
//! - `refresh`: non-reentrant hierarchy refresh with an optional periodic timer
//! - `session`: tap selection, quick actions and auto-insert authoring

pub mod backend;
pub mod refresh;
pub mod session;

pub use backend::{decode_device_info, decode_hierarchy, ChunkStream, DeviceBackend, HttpBackend};
pub use refresh::{HierarchyRefresher, HierarchySnapshot, RefreshResult};
pub use session::{InsertedStep, InspectorSession, QuickAction, Selection};
