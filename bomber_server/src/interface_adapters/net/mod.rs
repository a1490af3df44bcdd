// Network adapter modules split by player sockets vs lobby management routes.

pub mod client;
pub mod internal;

pub use client::{spawn_lobby_serializer, world_update_serializer, ws_handler};
pub use internal::create_lobby_handler;
