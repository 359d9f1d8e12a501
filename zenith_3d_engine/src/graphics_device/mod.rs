/// Graphics device module - the primitive capability the engine consumes

pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod pipeline;
pub mod binding_group;
pub mod command_list;

// Recording device for tests and headless tooling (no GPU required)
pub mod mock;

pub use graphics_device::*;
pub use buffer::*;
pub use texture::*;
pub use pipeline::*;
pub use binding_group::*;
pub use command_list::*;
