//! Node server bootstrap

use crate::common::{NodeConfig, Result};
use crate::coordinator::gossip::spawn_periodic_gossip;
use crate::coordinator::http::create_router;
use crate::coordinator::node::DynamoServer;
use crate::transport::HttpTransport;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct NodeServer {
    config: NodeConfig,
}

impl NodeServer {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    /// Bind, serve until ctrl-c, then shut down gracefully
    pub async fn serve(self) -> Result<()> {
        self.config.validate()?;
        tracing::info!("Starting dynamokv {}", crate::BUILD_INFO);
        tracing::info!("  Node ID: {}", self.config.node_id);
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Advertised as: {}", self.config.self_node());
        tracing::info!(
            "  Quorum: W={} R={}",
            self.config.write_quorum,
            self.config.read_quorum
        );

        let transport = Arc::new(HttpTransport::new(self.config.rpc_timeout())?);
        let node = Arc::new(DynamoServer::from_config(&self.config, transport)?);
        let list = node.preference_list();
        if list.is_empty() {
            tracing::info!("  Preference list: (awaiting SendPreferenceList)");
        } else {
            for (slot, peer) in list.nodes().iter().enumerate() {
                tracing::info!("  Preference list [{}]: {}", slot, peer);
            }
        }

        let gossip_handle = self.config.gossip_interval().map(|interval| {
            tracing::info!("  Periodic gossip every {:?}", interval);
            spawn_periodic_gossip(node.clone(), interval)
        });

        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("✓ Node ready");

        let result = serve_listener(
            listener,
            node,
            self.config.max_body_bytes,
            shutdown_signal(),
        )
        .await;

        if let Some(handle) = gossip_handle {
            handle.abort();
        }
        tracing::info!("Node stopped");
        result
    }
}

/// Serve the node API on an already-bound listener until `shutdown` resolves
pub async fn serve_listener<F>(
    listener: TcpListener,
    node: Arc<DynamoServer>,
    max_body_bytes: usize,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(node, max_body_bytes);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
