//! # tabpin-cli
//!
//! The command-line surface over [`tabpin_core`]: display-server access
//! behind the [`backend`] traits, flag and config-file merging in [`cli`]
//! and [`config`], and the apply/reset/list flows in [`apply`].
//!
//! The binary (`tabpin`) wires a live X11 session into
//! [`apply::MapperService`]; tests wire in [`backend::MockBackend`]
//! instead and exercise the same flows end to end.

pub mod apply;
pub mod backend;
pub mod cli;
pub mod config;
