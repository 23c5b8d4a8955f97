use anyhow::{bail, Context, Result};

use nodetable_client::{ClientConfig, GraphSession};
use nodetable_core::{ColumnDefinition, NodeId, Row, TableId};
use nodetable_monitoring::{LogExt, MonitoringConfig};

const USAGE: &str = "usage: nodetable [tables | table <id> | nodes]";

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::load().context("Failed to load configuration")?;

    // Set up monitoring
    let monitoring_config = MonitoringConfig {
        log_filter: config.log_level.clone(),
        enable_json_logging: std::env::var("LOG_JSON").map(|v| v == "1" || v == "true").unwrap_or(false),
        environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()),
        ..MonitoringConfig::default()
    };
    nodetable_monitoring::init(&monitoring_config).context("Failed to initialize monitoring")?;

    let session = GraphSession::from_config(&config).context("Failed to create session")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["tables"] => list_tables(&session).await,
        ["nodes"] => list_nodes(&session).await,
        ["table", id] => {
            let id: i64 = id.parse().with_context(|| format!("Invalid table id: {}", id))?;
            print_table(&session, TableId(id)).await
        }
        _ => bail!(USAGE),
    }
}

async fn list_tables(session: &GraphSession) -> Result<()> {
    let tables = session
        .tables()
        .await
        .into_result()
        .log_err("Failed to list tables")
        .context("Failed to list tables")?;

    for table in tables.iter() {
        println!("{}\t{}\t{} rows", table.id, table.def.label, table.rows.len());
    }
    Ok(())
}

async fn list_nodes(session: &GraphSession) -> Result<()> {
    let nodes = session
        .nodes()
        .await
        .into_result()
        .log_err("Failed to list nodes")
        .context("Failed to list nodes")?;

    for node in nodes.iter() {
        println!("{}\t{}", node.node_id, node.label);
    }
    Ok(())
}

async fn print_table(session: &GraphSession, id: TableId) -> Result<()> {
    let view = session.table_view(id).await;
    let nodes = view.nodes.clone();
    let predicates = view.predicates.clone();
    let table = view
        .table
        .into_result()
        .log_err("Failed to load table")
        .with_context(|| format!("Failed to load table {}", id))?;

    let label = |node: NodeId| {
        nodes
            .label_of(node)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", node))
    };

    let headers: Vec<String> = table
        .def
        .columns
        .iter()
        .map(|column| {
            let predicate = column
                .filter
                .predicate_id
                .and_then(|id| predicates.predicate(id))
                .map(|p| p.label.clone())
                .unwrap_or_else(|| "?".to_string());
            let direction = column
                .filter
                .direction
                .map(|d| d.as_str())
                .unwrap_or("any");
            format!("{} ({})", predicate, direction)
        })
        .collect();

    println!("{}", table.def.label);
    println!("node\t{}", headers.join("\t"));
    for row in &table.rows {
        println!("{}", format_row(row, &table.def.columns, &label));
    }
    Ok(())
}

fn format_row<F>(row: &Row, columns: &[ColumnDefinition], label: &F) -> String
where
    F: Fn(NodeId) -> String,
{
    let mut fields = vec![label(row.node_id)];
    for column in columns {
        let values = row
            .cell(column.id)
            .map(|cell| cell.values.iter().map(|v| label(*v)).collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        fields.push(values);
    }
    fields.join("\t")
}
