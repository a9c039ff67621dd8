use crate::error::ProbeError;
use crate::target::TargetDescriptor;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Row};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

const INTROSPECTION_QUERY: &str = "SHOW TABLES";

/// Connects, lists tables, disconnects.
pub(super) async fn check(target: &TargetDescriptor, deadline: Duration) -> Result<(), ProbeError> {
    let mut opts = OptsBuilder::default()
        .ip_or_hostname(target.host.clone())
        .tcp_port(target.port)
        .user(Some(target.credentials.user.clone()))
        .pass(Some(target.credentials.password.clone()))
        .db_name(Some(target.name.clone()));
    if let Some(tls) = &target.tls {
        opts = opts.ssl_opts(Some(tls.mysql_ssl_opts()));
    }

    let mut conn = match timeout(deadline, Conn::new(opts)).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => return Err(map_connect_error(e)),
        Err(_) => return Err(ProbeError::Connect(format!("connect timed out after {:?}", deadline))),
    };

    let result = list_tables(&mut conn, deadline).await;

    // Release on every path, including the deadline one.
    match timeout(deadline, conn.disconnect()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(db = %target, "disconnect failed: {}", e),
        Err(_) => debug!(db = %target, "disconnect timed out"),
    }

    let tables = result?;
    debug!(db = %target, tables = tables.len(), "introspection ok");
    Ok(())
}

async fn list_tables(conn: &mut Conn, deadline: Duration) -> Result<Vec<String>, ProbeError> {
    let rows: Vec<Row> = match timeout(deadline, conn.query::<Row, _>(INTROSPECTION_QUERY)).await {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => return Err(ProbeError::Query(format!("query '{}': {}", INTROSPECTION_QUERY, e))),
        Err(_) => {
            return Err(ProbeError::Query(format!(
                "query '{}': deadline of {:?} exceeded",
                INTROSPECTION_QUERY, deadline
            )))
        }
    };

    rows.into_iter()
        .map(|row| {
            mysql_async::from_row_opt::<String>(row).map_err(|e| {
                ProbeError::QueryDecode(format!("for query '{}', cannot read table: {}", INTROSPECTION_QUERY, e))
            })
        })
        .collect()
}

/// Handshake failures are transport failures and stay retryable: the driver
/// wraps plain resets and EOF during the TLS upgrade as TLS errors. Unusable
/// trust material is rejected at configuration time instead.
fn map_connect_error(e: mysql_async::Error) -> ProbeError {
    match e {
        mysql_async::Error::Io(mysql_async::IoError::Tls(tls)) => ProbeError::Connect(format!("tls handshake: {}", tls)),
        other => ProbeError::Connect(other.to_string()),
    }
}
