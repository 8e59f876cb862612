pub mod column_order;
pub mod command_palette;
pub mod config;
pub mod edits;
pub mod executor;
pub mod export;
pub mod grid;
pub mod grid_interact;
pub mod grid_render;
pub mod preview;
pub mod query_input;
pub mod resultset;
pub mod schema_tree;
pub mod selection;
pub mod sqlgen;
pub mod theme;
pub mod uistate;
pub mod workspace;
