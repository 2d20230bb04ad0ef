//! UI hierarchy snapshots
//!
//! - `node`: the raw tree and geometry types
//! - `flatten`: tree → flat, addressable element list
//! - `hit_test`: tap coordinate → best-covering element
//! - `xml`: uiautomator dump → tree

pub mod flatten;
pub mod node;
pub mod xml;

pub use flatten::{flatten, Element};
pub use hit_test::{hit_test, hit_test_or_point};
pub use node::{Bounds, DeviceFrame, ScreenPoint, UiNode};
