use tracing::debug;

use crate::error::{Result, TaxonError};
use crate::export::{ExportFormat, SpreadsheetExporter};
use crate::importer::{SpreadsheetImporter, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::render::TreeRenderer;
use crate::repository::CategoryRepository;
use crate::store::CategoryStore;

// ---------------------------------------------------------------------------
// Command names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    AddElement,
    RemoveElement,
    ViewTree,
    Download,
    Upload,
    Help,
}

const ALL_COMMANDS: &[CommandName] = &[
    CommandName::AddElement,
    CommandName::RemoveElement,
    CommandName::ViewTree,
    CommandName::Download,
    CommandName::Upload,
    CommandName::Help,
];

impl CommandName {
    pub fn token(&self) -> &'static str {
        match self {
            Self::AddElement => "/addElement",
            Self::RemoveElement => "/removeElement",
            Self::ViewTree => "/viewTree",
            Self::Download => "/download",
            Self::Upload => "/upload",
            Self::Help => "/help",
        }
    }

    pub fn usage(&self) -> &'static str {
        match self {
            Self::AddElement => "/addElement <name> | /addElement <parent> <child>",
            Self::RemoveElement => "/removeElement <name>",
            Self::ViewTree => "/viewTree",
            Self::Download => "/download",
            Self::Upload => "/upload",
            Self::Help => "/help",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::AddElement => "add a root category, or a child under an existing one",
            Self::RemoveElement => "remove a category and everything beneath it",
            Self::ViewTree => "show the whole category tree",
            Self::Download => "download the categories as a spreadsheet",
            Self::Upload => "upload a spreadsheet of categories to merge in",
            Self::Help => "list available commands",
        }
    }

    /// Case-insensitive lookup by token, e.g. `/ADDELEMENT`.
    pub fn from_token(text: &str) -> Option<Self> {
        ALL_COMMANDS
            .iter()
            .find(|c| c.token().eq_ignore_ascii_case(text))
            .copied()
    }
}

pub fn help_text() -> String {
    let mut out = String::from("Available commands:\n");
    for cmd in ALL_COMMANDS {
        out.push_str(&format!("  {:<48} {}\n", cmd.usage(), cmd.description()));
    }
    out
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Document {
        file_name: String,
        caption: String,
        bytes: Vec<u8>,
    },
}

/// Executes already-tokenized commands against the store. The first token
/// is the command name, the rest are positional arguments with quoting
/// already resolved.
pub struct CommandService<'s, R> {
    store: &'s CategoryStore<R>,
    max_payload_bytes: u64,
    export_format: ExportFormat,
}

impl<'s, R: CategoryRepository> CommandService<'s, R> {
    pub fn new(store: &'s CategoryStore<R>) -> Self {
        Self {
            store,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            export_format: ExportFormat::default(),
        }
    }

    pub fn with_limit(mut self, max_payload_bytes: u64) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.export_format = format;
        self
    }

    pub fn execute(&self, tokens: &[String]) -> Result<Reply> {
        let (first, args) = tokens
            .split_first()
            .ok_or_else(|| TaxonError::Usage("empty command; try /help".into()))?;
        let cmd = CommandName::from_token(first)
            .ok_or_else(|| TaxonError::UnknownCommand(first.clone()))?;
        debug!(command = cmd.token(), args = args.len(), "executing command");

        match (cmd, args) {
            (CommandName::AddElement, [name]) => {
                self.store.add_root(name)?;
                Ok(Reply::Text(format!("Root category <<{}>> added.", name.trim())))
            }
            (CommandName::AddElement, [parent, child]) => {
                self.store.add_child(parent, child)?;
                Ok(Reply::Text(format!("Child category <<{}>> added.", child.trim())))
            }
            (CommandName::RemoveElement, [name]) => {
                let removed = self.store.remove(name)?;
                Ok(Reply::Text(format!(
                    "Category <<{}>> removed ({removed} in total).",
                    name.trim()
                )))
            }
            (CommandName::ViewTree, []) => {
                Ok(Reply::Text(TreeRenderer::new(self.store).render_tree()?))
            }
            (CommandName::Download, []) => {
                let bytes = SpreadsheetExporter::new(self.store)
                    .export(self.export_format, self.max_payload_bytes)?;
                Ok(Reply::Document {
                    file_name: format!("Categories.{}", self.export_format.extension()),
                    caption: "Category tree".into(),
                    bytes,
                })
            }
            (CommandName::Upload, []) => Ok(Reply::Text(
                "Send a spreadsheet with columns id, name, parent_id.".into(),
            )),
            (CommandName::Help, _) => Ok(Reply::Text(help_text())),
            (cmd, _) => Err(TaxonError::Usage(cmd.usage().into())),
        }
    }

    /// Entry point for a received spreadsheet document.
    pub fn handle_document(&self, bytes: &[u8]) -> Result<Reply> {
        let summary = SpreadsheetImporter::new(self.store)
            .with_limit(self.max_payload_bytes)
            .import(bytes)?;
        Ok(Reply::Text(format!(
            "Categories imported: {} rows, {} created, {} reused, {} relinked.",
            summary.rows, summary.created, summary.reused, summary.relinked
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;
    use crate::repository::SqliteRepository;

    fn tokens(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(t) => t,
            Reply::Document { .. } => panic!("expected text reply"),
        }
    }

    #[test]
    fn test_from_token_is_case_insensitive() {
        assert_eq!(CommandName::from_token("/ADDELEMENT"), Some(CommandName::AddElement));
        assert_eq!(CommandName::from_token("/viewtree"), Some(CommandName::ViewTree));
        assert_eq!(CommandName::from_token("addElement"), None);
    }

    #[test]
    fn test_add_root_and_child() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        let svc = CommandService::new(&store);

        let reply = text(svc.execute(&tokens(&["/addElement", "Home Appliances"])).unwrap());
        assert!(reply.contains("Home Appliances"));
        svc.execute(&tokens(&["/addElement", "Home Appliances", "Fridges"]))
            .unwrap();
        let tree = text(svc.execute(&tokens(&["/viewTree"])).unwrap());
        assert!(tree.contains("- Home Appliances\n  - Fridges\n"));
    }

    #[test]
    fn test_wrong_arity_is_usage_error() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        let svc = CommandService::new(&store);
        for bad in [
            vec!["/addElement"],
            vec!["/addElement", "a", "b", "c"],
            vec!["/removeElement"],
            vec!["/viewTree", "extra"],
            vec!["/download", "extra"],
        ] {
            let err = svc.execute(&tokens(&bad)).unwrap_err();
            assert!(matches!(err, TaxonError::Usage(_)), "{bad:?} gave {err}");
        }
    }

    #[test]
    fn test_unknown_and_empty_commands() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        let svc = CommandService::new(&store);
        assert!(matches!(
            svc.execute(&tokens(&["/frobnicate"])).unwrap_err(),
            TaxonError::UnknownCommand(_)
        ));
        assert!(matches!(svc.execute(&[]).unwrap_err(), TaxonError::Usage(_)));
    }

    #[test]
    fn test_typed_failures_pass_through() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        let svc = CommandService::new(&store);
        assert!(matches!(
            svc.execute(&tokens(&["/viewTree"])).unwrap_err(),
            TaxonError::EmptyTree
        ));
        assert!(matches!(
            svc.execute(&tokens(&["/removeElement", "ghost"])).unwrap_err(),
            TaxonError::NotFound(_)
        ));
        assert!(matches!(
            svc.execute(&tokens(&["/addElement", "ghost", "kid"])).unwrap_err(),
            TaxonError::ParentNotFound(_)
        ));
        assert!(matches!(
            svc.execute(&tokens(&["/download"])).unwrap_err(),
            TaxonError::EmptyStore
        ));
    }

    #[test]
    fn test_download_then_upload_round_trip() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        let svc = CommandService::new(&store).with_format(ExportFormat::Csv);
        svc.execute(&tokens(&["/addElement", "Root"])).unwrap();
        svc.execute(&tokens(&["/addElement", "Root", "Leaf"])).unwrap();

        let Reply::Document { file_name, bytes, .. } = svc.execute(&tokens(&["/download"])).unwrap()
        else {
            panic!("expected a document");
        };
        assert_eq!(file_name, "Categories.csv");

        let reply = text(svc.handle_document(&bytes).unwrap());
        assert!(reply.contains("0 created"));
        assert_eq!(store.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_download_respects_limit() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        let svc = CommandService::new(&store)
            .with_format(ExportFormat::Csv)
            .with_limit(4);
        svc.execute(&tokens(&["/addElement", "Root"])).unwrap();
        assert!(matches!(
            svc.execute(&tokens(&["/download"])).unwrap_err(),
            TaxonError::SizeLimitExceeded { .. }
        ));
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for cmd in ALL_COMMANDS {
            assert!(help.contains(cmd.token()), "help is missing {}", cmd.token());
        }
    }
}
