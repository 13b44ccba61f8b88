mod surface_region;

pub use surface_region::{outer_loop_index, SurfaceRegion};
