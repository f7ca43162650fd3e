//! On-disk formats: capture containers and the vehicle catalog.

pub mod catalog;
pub mod container;

pub use catalog::VehicleCatalog;
pub use container::{
    open_reader, read_header_meta, ContainerKind, ContainerWriter, HeaderMeta, SessionMeta, FRAME_MAGIC, GZIP_COMMENT,
};
