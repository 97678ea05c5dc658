//! SQLite engine implementation

use arrow::record_batch::RecordBatch;
use csv::{ReaderBuilder, StringRecord};
use lq_core::{CanonicalFile, ColumnDescriptor};
use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};
use tracing::{debug, info};

use super::{batch, Engine, EngineFactory};
use crate::config::{EngineConfig, CANONICAL_DELIMITER};
use crate::schema::SchemaDetector;
use crate::DataError;

/// Opens a [`SqliteEngine`] during the handshake
pub struct SqliteEngineFactory {
    config: EngineConfig,
}

impl SqliteEngineFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for SqliteEngineFactory {
    fn open(&self) -> Result<Box<dyn Engine>, DataError> {
        Ok(Box::new(SqliteEngine::open(&self.config)?))
    }
}

/// Engine backed by an embedded SQLite database. Each registered file
/// becomes a table named exactly like the file.
pub struct SqliteEngine {
    conn: Connection,
    detector: SchemaDetector,
}

impl SqliteEngine {
    /// Open a private in-memory database; nothing outlives the engine
    pub fn open(config: &EngineConfig) -> Result<Self, DataError> {
        let conn = Connection::open_in_memory()?;

        if let Some(kib) = config.cache_size_kib {
            conn.pragma_update(None, "cache_size", -kib)?;
        }

        info!("SQLite {} engine opened in memory", rusqlite::version());

        Ok(Self {
            conn,
            detector: SchemaDetector::new()
                .with_sample_size(config.sample_size)
                .with_null_config(config.null_config.clone()),
        })
    }
}

impl Engine for SqliteEngine {
    fn register_file(&mut self, file: &CanonicalFile) -> Result<(), DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(CANONICAL_DELIMITER)
            .flexible(true)
            .from_reader(file.bytes.as_slice());

        let headers = column_names(reader.headers()?);
        if headers.is_empty() {
            return Err(DataError::SchemaDetection(format!("'{}' has no columns", file.name)));
        }

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            records.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        }

        let detected = self.detector.detect_from_samples(&headers, &records);
        let null_config = self.detector.null_config();

        let table = quote_identifier(&file.name);
        let column_defs = headers
            .iter()
            .zip(&detected)
            .map(|(name, (column_type, _))| format!("{} {}", quote_identifier(name), column_type.sql_name()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=headers.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
        tx.execute(&format!("CREATE TABLE {} ({})", table, column_defs), [])?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {} VALUES ({})", table, placeholders))?;
            for record in &records {
                let values = detected.iter().enumerate().map(|(idx, (column_type, _))| {
                    match record.get(idx) {
                        Some(value) if !null_config.is_null(value) => column_type.to_sql_value(value),
                        _ => SqlValue::Null,
                    }
                });
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        for (name, (column_type, stats)) in headers.iter().zip(&detected) {
            debug!("  {} {} ({} values, {} nulls)", name, column_type.sql_name(), stats.value_count, stats.null_count);
        }
        info!("Registered {} ({} rows, {} columns)", file.name, records.len(), headers.len());

        Ok(())
    }

    fn describe(&mut self, name: &str) -> Result<Vec<ColumnDescriptor>, DataError> {
        let mut stmt = self.conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([name], |row| {
                Ok(ColumnDescriptor::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(DataError::UnknownDataset(name.to_string()));
        }
        Ok(columns)
    }

    fn query(&mut self, sql: &str) -> Result<RecordBatch, DataError> {
        batch::execute(&self.conn, sql)
    }
}

/// Header names with blanks filled in and duplicates suffixed
fn column_names(headers: &StringRecord) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let header = header.trim_start_matches('\u{feff}').trim();
        let base = if header.is_empty() {
            format!("column{}", idx)
        } else {
            header.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }
    names
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NullConfig;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{DataType, Int64Type};

    fn engine() -> SqliteEngine {
        SqliteEngine::open(&EngineConfig::default()).unwrap()
    }

    fn csv_file(name: &str, text: &str) -> CanonicalFile {
        CanonicalFile {
            name: name.to_string(),
            bytes: text.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_register_and_describe() {
        let mut engine = engine();
        engine
            .register_file(&csv_file("sales.csv", "region,units,price,day\nnorth,3,1.5,2024-03-05\nsouth,4,2.25,2024-03-06\n"))
            .unwrap();

        let columns = engine.describe("sales.csv").unwrap();
        assert_eq!(columns, vec![
            ColumnDescriptor::new("region", "VARCHAR"),
            ColumnDescriptor::new("units", "BIGINT"),
            ColumnDescriptor::new("price", "DOUBLE"),
            ColumnDescriptor::new("day", "DATE"),
        ]);
    }

    #[test]
    fn test_query_by_file_name() {
        let mut engine = engine();
        engine
            .register_file(&csv_file("sales.csv", "region,units\nnorth,3\nsouth,4\nnorth,5\n"))
            .unwrap();

        let batch = engine
            .query("SELECT region, SUM(units) AS total FROM 'sales.csv' GROUP BY region ORDER BY region")
            .unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Int64);
        let totals = batch.column(1).as_primitive::<Int64Type>();
        assert_eq!(totals.value(0), 8);
        assert_eq!(totals.value(1), 4);
    }

    #[test]
    fn test_reregistering_overwrites() {
        let mut engine = engine();
        engine.register_file(&csv_file("t.csv", "a,b\n1,2\n")).unwrap();
        engine.register_file(&csv_file("t.csv", "c\nx\ny\n")).unwrap();

        let columns = engine.describe("t.csv").unwrap();
        assert_eq!(columns, vec![ColumnDescriptor::new("c", "VARCHAR")]);
        assert_eq!(engine.query("SELECT * FROM 't.csv'").unwrap().num_rows(), 2);
    }

    #[test]
    fn test_nulls_and_short_rows() {
        let mut engine = engine();
        engine.register_file(&csv_file("n.csv", "a,b\n1,\n2\n")).unwrap();

        let batch = engine.query("SELECT b FROM 'n.csv'").unwrap();
        assert_eq!(batch.column(0).null_count(), 2);
    }

    #[test]
    fn test_null_markers_are_kept_as_text() {
        let mut engine = engine();
        engine.register_file(&csv_file("m.csv", "a,b\n1,N/A\n2,NULL\n")).unwrap();

        let batch = engine.query("SELECT b FROM 'm.csv' ORDER BY a").unwrap();
        let values = batch.column(0).as_string::<i32>();
        assert_eq!(batch.column(0).null_count(), 0);
        assert_eq!(values.value(0), "N/A");
        assert_eq!(values.value(1), "NULL");
    }

    #[test]
    fn test_configured_null_markers() {
        let config = EngineConfig {
            null_config: NullConfig {
                patterns: vec![String::new(), "N/A".to_string()],
                ..NullConfig::default()
            },
            ..EngineConfig::default()
        };
        let mut engine = SqliteEngine::open(&config).unwrap();
        engine.register_file(&csv_file("m.csv", "a,b\n1,n/a\n2,7\n")).unwrap();

        assert_eq!(engine.describe("m.csv").unwrap()[1], ColumnDescriptor::new("b", "BIGINT"));
        let batch = engine.query("SELECT b FROM 'm.csv'").unwrap();
        assert_eq!(batch.column(0).null_count(), 1);
    }

    #[test]
    fn test_engines_do_not_share_data() {
        let mut first = engine();
        first.register_file(&csv_file("t.csv", "a\n1\n")).unwrap();

        let mut second = engine();
        assert!(matches!(second.describe("t.csv"), Err(DataError::UnknownDataset(_))));

        let file: String = first
            .conn
            .query_row("SELECT file FROM pragma_database_list WHERE name = 'main'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(file, "");
    }

    #[test]
    fn test_describe_unknown_dataset() {
        assert!(matches!(engine().describe("missing.csv"), Err(DataError::UnknownDataset(_))));
    }

    #[test]
    fn test_malformed_sql_is_an_error() {
        let err = engine().query("SELEC nonsense").unwrap_err();
        assert!(matches!(err, DataError::Sqlite(_)));
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        assert!(matches!(
            engine().register_file(&csv_file("empty.csv", "")),
            Err(DataError::SchemaDetection(_))
        ));
    }

    #[test]
    fn test_column_names() {
        let headers = StringRecord::from(vec!["\u{feff}id", "", "Name", "name"]);
        assert_eq!(column_names(&headers), vec!["id", "column1", "Name", "name_1"]);
    }
}
