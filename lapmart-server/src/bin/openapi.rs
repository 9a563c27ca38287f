use anyhow::Result;
use lapmart_server::docs::ApiDoc;
use std::{fs::File, io::Write, path::PathBuf};
use utoipa::OpenApi;

/// Write the OpenAPI document to the given path, or stdout without one
fn main() -> Result<()> {
    let json = ApiDoc::openapi().to_pretty_json()?;

    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => File::create(path)?.write_all(json.as_bytes())?,
        None => println!("{json}"),
    }

    Ok(())
}
