//! Scene sources

pub mod synthetic;

pub use synthetic::{SceneSynthesizer, SyntheticEvent, SyntheticSceneConfig};
