pub mod surface;

pub use surface::{SurfaceInputs, SurfaceModel};
