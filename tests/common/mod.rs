#![allow(dead_code)]

pub mod put;
pub mod snapshot_builder;

#[cfg(any(feature = "fof", feature = "subfind"))]
pub mod catalog_builder;
