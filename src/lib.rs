pub mod action;
pub mod actions;
pub mod animation;
pub mod audio;
pub mod cli;
pub mod config;
pub mod demo;
pub mod descriptor;
pub mod easing;
pub mod events;
pub mod generation;
pub mod layout;
pub mod library;
pub mod navigation;
pub mod parse;
pub mod predicate;
pub mod resolve;
pub mod runtime;
pub mod scope;
pub mod services;
pub mod stage;
pub mod time;
pub mod validation;
pub mod value;

pub use demo::{run, run_with_overrides};
pub use runtime::MenuRuntime;
