use anyhow::Result;

use crate::render;
use crate::runtime::{self, GlobalOpts};

pub async fn run(opts: &GlobalOpts) -> Result<()> {
    let registry = runtime::load_registry(opts).await?;
    for persona in registry.iter() {
        println!("{}", render::persona_block(persona));
        println!();
    }
    println!("{} personas", registry.len());
    Ok(())
}
