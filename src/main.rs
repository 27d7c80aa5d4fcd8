mod app;
mod config;
mod engine;
mod input;
mod model;
mod render;
mod store;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
