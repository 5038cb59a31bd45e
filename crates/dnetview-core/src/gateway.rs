// ── RPC gateway seam ──
//
// The poller only needs "fetch this endpoint's state". Production uses
// `dnetview_api::RpcClient`; tests plug in scripted fakes.

use std::future::Future;
use std::sync::Arc;

use url::Url;

use dnetview_api::{NodeStatePayload, RpcClient};

/// Source of raw node state, one call per node per round.
pub trait NodeGateway: Send + Sync + 'static {
    fn fetch_node_state(
        &self,
        endpoint: &Url,
    ) -> impl Future<Output = Result<NodeStatePayload, dnetview_api::Error>> + Send;
}

impl NodeGateway for RpcClient {
    fn fetch_node_state(
        &self,
        endpoint: &Url,
    ) -> impl Future<Output = Result<NodeStatePayload, dnetview_api::Error>> + Send {
        self.get_info(endpoint)
    }
}

impl<G: NodeGateway> NodeGateway for Arc<G> {
    fn fetch_node_state(
        &self,
        endpoint: &Url,
    ) -> impl Future<Output = Result<NodeStatePayload, dnetview_api::Error>> + Send {
        G::fetch_node_state(self, endpoint)
    }
}
