//! Handle to a model already present on disk (spec.md §4.6.4's result, and
//! the `system` namespace's model listing).

use serde_json::json;

use super::download_stream::DownloadStream;
use crate::endpoints::download::DownloadProgress;
use crate::error::{Error, Result};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedModelHandle {
    identifier: String,
    path: String,
}

impl DownloadedModelHandle {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Download `model_key`, reporting progress to `on_progress` as it
    /// comes in (spec.md §4.6.4), and returning a handle to the resulting
    /// on-disk model.
    pub async fn download(
        session: &Session,
        model_key: &str,
        mut on_progress: impl FnMut(&DownloadProgress) + Send,
    ) -> Result<Self> {
        let mut stream = DownloadStream::start(session, model_key).await?;
        while let Some(progress) = stream.next_progress().await? {
            on_progress(&progress);
        }
        let path = stream.into_result().await?;
        Ok(Self {
            identifier: model_key.to_string(),
            path,
        })
    }

    /// List every model downloaded on the server (`system` namespace).
    pub async fn list(session: &Session) -> Result<Vec<Self>> {
        let result = session.remote_call("listDownloadedModels", json!({})).await?;
        let entries = result
            .as_array()
            .ok_or_else(|| Error::Value("listDownloadedModels did not return an array".to_string()))?;

        entries
            .iter()
            .map(|entry| {
                let identifier = entry
                    .get("identifier")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::Value("downloaded model entry missing identifier".to_string()))?
                    .to_string();
                let path = entry
                    .get("path")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Ok(Self { identifier, path })
            })
            .collect()
    }

    /// Remove this model from disk.
    pub async fn delete(&self, session: &Session) -> Result<()> {
        session
            .remote_call("deleteDownloadedModel", json!({"identifier": self.identifier}))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::protocol::Namespace;
    use crate::pump::Pump;
    use crate::transport::fake::FakeTransport;

    fn test_session() -> (Session, crate::transport::fake::FakeServerHandle) {
        let (client, server) = FakeTransport::pair();
        let pump = Pump::spawn(Box::new(client));
        let session = Session::from_pump(Namespace::System, ClientConfig::default(), pump);
        (session, server)
    }

    #[tokio::test]
    async fn list_parses_every_entry() {
        let (session, mut server) = test_session();
        let server_task = tokio::spawn(async move {
            let call = server.recv().await.unwrap();
            let call_id = call["callId"].as_u64().unwrap();
            server.send(json!({
                "type": "rpcResult",
                "callId": call_id,
                "result": [
                    {"identifier": "m1", "path": "/models/m1.gguf"},
                    {"identifier": "m2", "path": "/models/m2.gguf"}
                ]
            }));
        });

        let list = DownloadedModelHandle::list(&session).await.unwrap();
        server_task.await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].identifier(), "m1");
        assert_eq!(list[1].path(), "/models/m2.gguf");
    }

    #[tokio::test]
    async fn download_reports_progress_and_resolves_handle() {
        let (session, mut server) = test_session();
        let server_task = tokio::spawn(async move {
            let create = server.recv().await.unwrap();
            assert_eq!(create["endpoint"], "downloadModel");
            let channel_id = create["channelId"].as_u64().unwrap();
            server.send(json!({
                "type": "channelSend", "channelId": channel_id,
                "message": {"type": "downloadProgress", "downloadedBytes": 250, "totalBytes": 1000}
            }));
            server.send(json!({
                "type": "channelSend", "channelId": channel_id,
                "message": {"type": "success", "path": "/models/llama-3.gguf"}
            }));
            server.send(json!({"type": "channelClose", "channelId": channel_id}));
        });

        let mut seen_fractions = Vec::new();
        let handle = DownloadedModelHandle::download(&session, "llama-3-gguf", |progress| {
            seen_fractions.push(progress.fraction);
        })
        .await
        .unwrap();
        server_task.await.unwrap();

        assert_eq!(handle.identifier(), "llama-3-gguf");
        assert_eq!(handle.path(), "/models/llama-3.gguf");
        assert_eq!(seen_fractions, vec![0.25]);
    }
}
