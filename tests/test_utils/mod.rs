#![allow(unused_imports)]

pub mod fixtures;

pub use fixtures::{
    CollectingNotifier, Folders, folders, quick_builder, quick_timeouts, read_lines, wait_for,
};
