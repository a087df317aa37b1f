// Adapters layer: concrete implementations for external systems (object stores, spreadsheets, dump tools)

pub mod dump;
pub mod sheet;
pub mod storage;
