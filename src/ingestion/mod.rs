//! Multimodal document ingestion.
//!
//! Each document in the source folder goes through three independent
//! extraction stages (text, images, tables). The resulting units are embedded
//! together and appended to the vector store in one batch at the end of the
//! run.

mod caption;
mod loader;
mod raster;
mod report;
mod tables;

pub use caption::{fallback_description, mime_for_extension, Captioner, OpenAICaptioner};
pub use loader::{default_loaders, DocumentLoader, PageImage, PageText, PdfLoader, PlainTextLoader};
pub use report::{DocumentReport, IngestReport, StageOutcome};
pub use tables::{detect_tables, Table};

use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{DocgateError, Result};
use crate::vector_store::{ContentType, ExtractedUnit, UnitPayload, VectorStore};
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Output locations and naming for a run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub image_output_dir: PathBuf,
    pub table_output_dir: PathBuf,
    pub collection: String,
    /// Header names listed in a table description.
    pub description_columns: usize,
}

impl IngestOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            image_output_dir: settings.image_output_dir(),
            table_output_dir: settings.table_output_dir(),
            collection: settings.ingestion.collection.clone(),
            description_columns: settings.ingestion.description_columns,
        }
    }
}

/// A unit waiting for its embedding.
struct PendingUnit {
    content: String,
    /// Text sent to the embedder.
    embed_text: String,
    content_type: ContentType,
    page: u32,
    payload: UnitPayload,
}

/// Drives extraction, description, embedding and persistence.
pub struct IngestionPipeline {
    loaders: Vec<Box<dyn DocumentLoader>>,
    captioner: Option<Arc<dyn Captioner>>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    options: IngestOptions,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, options: IngestOptions) -> Self {
        Self {
            loaders: default_loaders(),
            captioner: None,
            embedder,
            store,
            options,
        }
    }

    pub fn with_captioner(mut self, captioner: Arc<dyn Captioner>) -> Self {
        self.captioner = Some(captioner);
        self
    }

    pub fn with_loaders(mut self, loaders: Vec<Box<dyn DocumentLoader>>) -> Self {
        self.loaders = loaders;
        self
    }

    /// Ingest every supported document directly inside `source_dir`.
    #[instrument(skip(self), fields(collection = %self.options.collection))]
    pub async fn run(&self, source_dir: &Path) -> Result<IngestReport> {
        let files = list_documents(source_dir)?;
        std::fs::create_dir_all(&self.options.image_output_dir)?;
        std::fs::create_dir_all(&self.options.table_output_dir)?;

        let mut report = IngestReport {
            collection: self.options.collection.clone(),
            documents: Vec::new(),
            skipped: Vec::new(),
            units_appended: 0,
        };
        let mut pending: Vec<(String, PendingUnit)> = Vec::new();

        for path in files {
            let name = file_name(&path);
            let Some(loader) = self.loaders.iter().find(|l| l.supports(&path)) else {
                debug!("Skipping unsupported file {}", name);
                report.skipped.push(name);
                continue;
            };

            info!("Processing {}", name);
            let (doc_report, units) = self.process_document(&path, loader.as_ref()).await;
            if doc_report.has_failures() {
                warn!("{} ingested with failed stages", name);
            }
            report.documents.push(doc_report);
            pending.extend(units.into_iter().map(|u| (name.clone(), u)));
        }

        if pending.is_empty() {
            info!("No units extracted from {}", source_dir.display());
            return Ok(report);
        }

        report.units_appended = self.embed_and_store(pending).await?;
        info!(
            "Ingested {} units from {} documents",
            report.units_appended,
            report.documents.len()
        );
        Ok(report)
    }

    /// Embed every pending unit in one batch and append them together.
    async fn embed_and_store(&self, pending: Vec<(String, PendingUnit)>) -> Result<usize> {
        let texts: Vec<String> = pending.iter().map(|(_, u)| u.embed_text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != pending.len() {
            return Err(DocgateError::Embedding(format!(
                "Expected {} embeddings, got {}",
                pending.len(),
                embeddings.len()
            )));
        }

        let units: Vec<ExtractedUnit> = pending
            .into_iter()
            .zip(embeddings)
            .map(|((source, u), embedding)| {
                ExtractedUnit::new(u.content, u.content_type, source, u.page, embedding, u.payload)
            })
            .collect();

        self.store.append(&self.options.collection, &units).await
    }

    /// Run all three stages for one document. Never fails as a whole.
    async fn process_document(
        &self,
        path: &Path,
        loader: &dyn DocumentLoader,
    ) -> (DocumentReport, Vec<PendingUnit>) {
        let name = file_name(path);
        let mut pending = Vec::new();

        let pages = loader.load_text(path);

        let text = match &pages {
            Ok(pages) => {
                let units = text_units(pages);
                let outcome = StageOutcome::from_count(units.len());
                pending.extend(units);
                outcome
            }
            Err(e) => stage_failed(&name, "text", e),
        };

        let images = match self.image_units(path, loader).await {
            Ok(units) => {
                let outcome = StageOutcome::from_count(units.len());
                pending.extend(units);
                outcome
            }
            Err(e) => stage_failed(&name, "image", &e),
        };

        // Tables are found in page text, so they fail with the text stage.
        let tables = match &pages {
            Ok(pages) => match self.table_units(path, pages) {
                Ok(units) => {
                    let outcome = StageOutcome::from_count(units.len());
                    pending.extend(units);
                    outcome
                }
                Err(e) => stage_failed(&name, "table", &e),
            },
            Err(e) => stage_failed(&name, "table", e),
        };

        let report = DocumentReport {
            document: name,
            text,
            images,
            tables,
        };
        (report, pending)
    }

    async fn image_units(&self, path: &Path, loader: &dyn DocumentLoader) -> Result<Vec<PendingUnit>> {
        let stem = file_stem(path);
        let mut units = Vec::new();

        for image in loader.load_images(path)? {
            let image_name = format!("{}_page{}_img{}.{}", stem, image.page, image.index, image.extension);
            let image_path = self.options.image_output_dir.join(&image_name);
            std::fs::write(&image_path, &image.bytes)?;

            let description = self.describe_image(&image, &image_name).await;
            units.push(PendingUnit {
                content: description.clone(),
                embed_text: description,
                content_type: ContentType::Image,
                page: image.page,
                payload: UnitPayload::Image {
                    image_b64: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                    image_path: image_path.display().to_string(),
                },
            });
        }

        Ok(units)
    }

    async fn describe_image(&self, image: &PageImage, image_name: &str) -> String {
        let Some(captioner) = &self.captioner else {
            return fallback_description(image_name);
        };

        match captioner.caption(&image.bytes, &image.extension).await {
            Ok(caption) => caption,
            Err(e) => {
                warn!("Captioning {} failed, using fallback: {}", image_name, e);
                fallback_description(image_name)
            }
        }
    }

    fn table_units(&self, path: &Path, pages: &[PageText]) -> Result<Vec<PendingUnit>> {
        let stem = file_stem(path);
        let mut units = Vec::new();

        for page in pages {
            for (i, table) in detect_tables(&page.text).into_iter().enumerate() {
                let table_name = format!("{}_page{}_table{}.csv", stem, page.page, i + 1);
                let table_path = self.options.table_output_dir.join(&table_name);

                let csv = table.to_csv()?;
                std::fs::write(&table_path, &csv)?;

                let description = table.describe(self.options.description_columns);
                units.push(PendingUnit {
                    content: format!("{}\n{}", description, csv),
                    embed_text: description,
                    content_type: ContentType::Table,
                    page: page.page,
                    payload: UnitPayload::Table {
                        table_json: table.to_json(),
                        table_csv: csv,
                        table_path: table_path.display().to_string(),
                        rows: table.row_count(),
                        columns: table.column_count(),
                    },
                });
            }
        }

        Ok(units)
    }
}

fn text_units(pages: &[PageText]) -> Vec<PendingUnit> {
    pages
        .iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| PendingUnit {
            content: p.text.clone(),
            embed_text: p.text.clone(),
            content_type: ContentType::Text,
            page: p.page,
            payload: UnitPayload::None,
        })
        .collect()
}

fn stage_failed(document: &str, stage: &str, error: &DocgateError) -> StageOutcome {
    warn!("{} extraction failed for {}: {}", stage, document, error);
    StageOutcome::Failed {
        error: error.to_string(),
    }
}

/// Regular files directly inside `dir`, sorted by name.
fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DocgateError::NotFound(format!(
            "source folder {} does not exist",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            DocgateError::Extraction(format!("Failed to read {}: {}", dir.display(), e))
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::test_support::{FailingEmbedder, KeywordEmbedder};
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Loader for `.fake` files with canned stage results.
    struct ScriptedLoader {
        text: std::result::Result<Vec<PageText>, String>,
        images: std::result::Result<Vec<PageImage>, String>,
    }

    impl DocumentLoader for ScriptedLoader {
        fn supports(&self, path: &Path) -> bool {
            path.extension().is_some_and(|e| e == "fake")
        }

        fn load_text(&self, _: &Path) -> Result<Vec<PageText>> {
            self.text.clone().map_err(DocgateError::Extraction)
        }

        fn load_images(&self, _: &Path) -> Result<Vec<PageImage>> {
            self.images.clone().map_err(DocgateError::Extraction)
        }
    }

    struct FixedCaptioner(std::result::Result<String, String>);

    #[async_trait]
    impl Captioner for FixedCaptioner {
        async fn caption(&self, _: &[u8], _: &str) -> Result<String> {
            self.0.clone().map_err(DocgateError::Captioning)
        }
    }

    struct Fixture {
        dir: TempDir,
        store: Arc<MemoryVectorStore>,
    }

    impl Fixture {
        fn new(files: &[&str]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir(dir.path().join("docs")).unwrap();
            for file in files {
                std::fs::write(dir.path().join("docs").join(file), "x").unwrap();
            }
            Self {
                dir,
                store: Arc::new(MemoryVectorStore::new()),
            }
        }

        fn source(&self) -> PathBuf {
            self.dir.path().join("docs")
        }

        fn pipeline(&self, embedder: Arc<dyn Embedder>) -> IngestionPipeline {
            let options = IngestOptions {
                image_output_dir: self.dir.path().join("images"),
                table_output_dir: self.dir.path().join("tables"),
                collection: "multimodal_rag".to_string(),
                description_columns: 5,
            };
            IngestionPipeline::new(embedder, self.store.clone(), options)
        }
    }

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(KeywordEmbedder {
            keywords: vec!["revenue", "chart", "table"],
        })
    }

    fn page(page: u32, text: &str) -> PageText {
        PageText {
            page,
            text: text.to_string(),
        }
    }

    fn image(page: u32, index: usize) -> PageImage {
        PageImage {
            page,
            index,
            bytes: vec![0xFF, 0xD8, 0xFF],
            extension: "jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_all_stages_produce_units() {
        let fixture = Fixture::new(&["report.fake"]);
        let loader = ScriptedLoader {
            text: Ok(vec![
                page(1, "Revenue grew."),
                page(2, "   "),
                page(3, "Region  Sales\nNorth  10\nSouth  20"),
            ]),
            images: Ok(vec![image(2, 1)]),
        };

        let report = fixture
            .pipeline(embedder())
            .with_loaders(vec![Box::new(loader)])
            .run(&fixture.source())
            .await
            .unwrap();

        let doc = &report.documents[0];
        assert_eq!(doc.text, StageOutcome::Extracted { count: 2 });
        assert_eq!(doc.images, StageOutcome::Extracted { count: 1 });
        assert_eq!(doc.tables, StageOutcome::Extracted { count: 1 });
        assert_eq!(report.units_appended, 4);

        assert!(fixture.dir.path().join("images/report_page2_img1.jpg").exists());
        let csv = std::fs::read_to_string(fixture.dir.path().join("tables/report_page3_table1.csv")).unwrap();
        assert_eq!(csv, "Region,Sales\nNorth,10\nSouth,20\n");

        let units = fixture.store.list("multimodal_rag", 10).await.unwrap();
        let image_unit = units.iter().find(|u| u.content_type == ContentType::Image).unwrap();
        assert_eq!(image_unit.content, "Image extracted from document: report_page2_img1.jpg");
        assert_eq!(image_unit.source_document, "report.fake");
        assert_eq!(image_unit.page, 2);
        assert!(matches!(&image_unit.payload, UnitPayload::Image { image_b64, .. } if image_b64 == "/9j/"));

        let table_unit = units.iter().find(|u| u.content_type == ContentType::Table).unwrap();
        assert!(table_unit
            .content
            .starts_with("Table with 2 rows and 2 columns. Columns: Region, Sales\n"));
        assert!(units.iter().all(|u| u.embedding.len() == 3));
    }

    #[tokio::test]
    async fn test_failed_stage_does_not_block_others() {
        let fixture = Fixture::new(&["a.fake"]);
        let loader = ScriptedLoader {
            text: Ok(vec![page(1, "Some text")]),
            images: Err("corrupt image stream".to_string()),
        };

        let report = fixture
            .pipeline(embedder())
            .with_loaders(vec![Box::new(loader)])
            .run(&fixture.source())
            .await
            .unwrap();

        let doc = &report.documents[0];
        assert_eq!(doc.text, StageOutcome::Extracted { count: 1 });
        assert!(matches!(&doc.images, StageOutcome::Failed { error } if error.contains("corrupt image stream")));
        assert_eq!(doc.tables, StageOutcome::Empty);
        assert_eq!(report.failed_stages(), 1);
        assert_eq!(fixture.store.count("multimodal_rag").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_text_failure_still_extracts_images() {
        let fixture = Fixture::new(&["a.fake", "b.fake"]);
        let loader = ScriptedLoader {
            text: Err("no text layer".to_string()),
            images: Ok(vec![image(1, 1)]),
        };

        let report = fixture
            .pipeline(embedder())
            .with_loaders(vec![Box::new(loader)])
            .run(&fixture.source())
            .await
            .unwrap();

        assert_eq!(report.documents.len(), 2);
        for doc in &report.documents {
            assert!(doc.text.is_failed());
            assert!(doc.tables.is_failed());
            assert_eq!(doc.images, StageOutcome::Extracted { count: 1 });
        }
        assert_eq!(report.units_appended, 2);
    }

    #[tokio::test]
    async fn test_captioner_and_its_fallback() {
        let fixture = Fixture::new(&["a.fake"]);
        let loader = || ScriptedLoader {
            text: Ok(Vec::new()),
            images: Ok(vec![image(1, 1)]),
        };

        fixture
            .pipeline(embedder())
            .with_loaders(vec![Box::new(loader())])
            .with_captioner(Arc::new(FixedCaptioner(Ok("A revenue chart".to_string()))))
            .run(&fixture.source())
            .await
            .unwrap();
        fixture
            .pipeline(embedder())
            .with_loaders(vec![Box::new(loader())])
            .with_captioner(Arc::new(FixedCaptioner(Err("rate limited".to_string()))))
            .run(&fixture.source())
            .await
            .unwrap();

        let contents: Vec<String> = fixture
            .store
            .list("multimodal_rag", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.content)
            .collect();
        assert_eq!(
            contents,
            ["A revenue chart", "Image extracted from document: a_page1_img1.jpg"]
        );
    }

    #[tokio::test]
    async fn test_plain_text_documents_and_skipped_files() {
        let fixture = Fixture::new(&["photo.png"]);
        std::fs::write(
            fixture.source().join("notes.md"),
            "Quarterly table\nitem | qty\nbolt | 4\n",
        )
        .unwrap();

        let report = fixture.pipeline(embedder()).run(&fixture.source()).await.unwrap();

        assert_eq!(report.skipped, ["photo.png"]);
        let doc = &report.documents[0];
        assert_eq!(doc.document, "notes.md");
        assert_eq!(doc.text, StageOutcome::Extracted { count: 1 });
        assert_eq!(doc.images, StageOutcome::Empty);
        assert_eq!(doc.tables, StageOutcome::Extracted { count: 1 });
    }

    #[tokio::test]
    async fn test_missing_source_folder_is_fatal() {
        let fixture = Fixture::new(&[]);
        let result = fixture
            .pipeline(embedder())
            .run(&fixture.dir.path().join("nope"))
            .await;
        assert!(matches!(result, Err(DocgateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_embedding_failure_appends_nothing() {
        let fixture = Fixture::new(&["a.fake"]);
        let loader = ScriptedLoader {
            text: Ok(vec![page(1, "text")]),
            images: Ok(Vec::new()),
        };

        let result = fixture
            .pipeline(Arc::new(FailingEmbedder))
            .with_loaders(vec![Box::new(loader)])
            .run(&fixture.source())
            .await;

        assert!(matches!(result, Err(DocgateError::Embedding(_))));
        assert_eq!(fixture.store.count("multimodal_rag").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reingesting_duplicates_units() {
        let fixture = Fixture::new(&["a.fake"]);
        for _ in 0..2 {
            let loader = ScriptedLoader {
                text: Ok(vec![page(1, "same page")]),
                images: Ok(Vec::new()),
            };
            fixture
                .pipeline(embedder())
                .with_loaders(vec![Box::new(loader)])
                .run(&fixture.source())
                .await
                .unwrap();
        }
        assert_eq!(fixture.store.count("multimodal_rag").await.unwrap(), 2);
    }
}
