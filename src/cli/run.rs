use std::path::{Path, PathBuf};

use crate::cli::export::write_document;
use crate::cli::open_db;
use crate::commands::{CommandService, Reply};
use crate::error::{Result, TaxonError};
use crate::importer::read_payload;
use crate::repository::SqliteRepository;
use crate::settings::load_settings;
use crate::store::CategoryStore;

pub fn run(
    db: Option<&Path>,
    document: Option<&Path>,
    output: Option<PathBuf>,
    tokens: &[String],
) -> Result<()> {
    if document.is_none() && tokens.is_empty() {
        return Err(TaxonError::Usage(
            "taxon run [--document FILE] </command> [args...]".into(),
        ));
    }

    let settings = load_settings();
    let conn = open_db(db)?;
    let store = CategoryStore::new(SqliteRepository::new(&conn));
    let service = CommandService::new(&store)
        .with_limit(settings.max_payload_bytes)
        .with_format(settings.export_format);

    if let Some(file) = document {
        let bytes = read_payload(file, settings.max_payload_bytes)?;
        deliver(service.handle_document(&bytes)?, output.as_deref())?;
    }
    if !tokens.is_empty() {
        deliver(service.execute(tokens)?, output.as_deref())?;
    }
    Ok(())
}

fn deliver(reply: Reply, output: Option<&Path>) -> Result<()> {
    match reply {
        Reply::Text(text) => println!("{}", text.trim_end()),
        Reply::Document {
            file_name,
            caption,
            bytes,
        } => {
            let path = match output {
                Some(p) => p.to_path_buf(),
                None => load_settings().exports_dir().join(file_name),
            };
            write_document(&path, &bytes)?;
            println!("{caption}: saved to {}", path.display());
        }
    }
    Ok(())
}
