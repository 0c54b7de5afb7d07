pub mod registrar;

pub use registrar::GalleryRegistrar;
