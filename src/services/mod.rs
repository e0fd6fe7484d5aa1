//! Storage services: the object-client contract, its local implementation,
//! and the filesystem layer built on top of it.

pub mod filesystem_adapter;
pub mod local_object_client;
pub mod object_client;
pub mod operation_helper;
pub mod path_prefixer;
pub mod public_url;
