//! Part-by-part customization of a shoe model.
//!
//! A [`scene::CustomizationState`] holds what every part should look like;
//! the [`reconcile::Reconciler`] makes a loaded [`render::SceneGraph`] match
//! it. Host applications drive the state over the [`channel`], users through
//! pointer input and the [`ui`] controls.

pub mod app;
pub mod assets;
pub mod channel;
pub mod config;
pub mod reconcile;
pub mod render;
pub mod scene;
pub mod ui;
