use crate::error::ProbeError;
use crate::target::TargetDescriptor;
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Builds a dedicated client from the target URI, lists the collections of
/// the target database, shuts the client down.
pub(super) async fn check(target: &TargetDescriptor, deadline: Duration) -> Result<(), ProbeError> {
    let uri = target
        .uri
        .as_deref()
        .ok_or_else(|| ProbeError::Connect("no connection URI configured".into()))?;

    let mut options = match timeout(deadline, ClientOptions::parse(uri)).await {
        Ok(Ok(options)) => options,
        Ok(Err(e)) => return Err(ProbeError::Connect(format!("failed to parse MongoDB options: {}", e))),
        Err(_) => return Err(ProbeError::Connect(format!("resolving URI timed out after {:?}", deadline))),
    };
    options.connect_timeout = Some(deadline);
    options.server_selection_timeout = Some(deadline);

    let client = Client::with_options(options)
        .map_err(|e| ProbeError::Connect(format!("failed to create MongoDB client: {}", e)))?;

    let result = match timeout(deadline, client.database(&target.name).list_collection_names()).await {
        Ok(Ok(collections)) => Ok(collections),
        Ok(Err(e)) => Err(map_list_error(e)),
        Err(_) => Err(ProbeError::Query(format!("list collections: deadline of {:?} exceeded", deadline))),
    };

    if timeout(deadline, client.shutdown()).await.is_err() {
        debug!(db = %target, "client shutdown timed out");
    }

    let collections = result?;
    debug!(db = %target, collections = collections.len(), "introspection ok");
    Ok(())
}

fn map_list_error(e: mongodb::error::Error) -> ProbeError {
    if matches!(*e.kind, ErrorKind::BsonDeserialization(_)) {
        ProbeError::QueryDecode(e.to_string())
    } else {
        ProbeError::Query(format!("list collections: {}", e))
    }
}
