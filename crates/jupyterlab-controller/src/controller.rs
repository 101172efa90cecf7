//! Jupyterlab controller implementation
//!
//! Level-triggered reconciliation: every pass re-reads the Jupyterlab and its
//! dependents, performs at most one corrective write on a dependent, and
//! returns. The controller runtime re-invokes the pass until nothing is left
//! to correct. Steps run in a fixed order:
//!
//! 1. fetch the Jupyterlab (gone means done)
//! 2. Deployment: create if absent, rescale if `spec.replicas` drifted
//! 3. Service: create if absent
//! 4. Route: create if absent (only when the Route API is served)
//! 5. refresh `status.nodes` from the pods selected by the instance labels

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use jupyterlab_common::crd::{Jupyterlab, JupyterlabStatus, Route};
use jupyterlab_common::events::{actions, reasons, EventPublisher};
use jupyterlab_common::kube_utils::{controller_owner_ref, is_controlled_by, ObjectKey};
use jupyterlab_common::labels::{matches_instance, selector_for};
use jupyterlab_common::{Error, KubeEventPublisher, FIELD_MANAGER};
#[cfg(test)]
use jupyterlab_common::NoopEventPublisher;

use crate::builders::{current_replicas, deployment_for, route_for, service_for, InstanceSettings};

/// Delay before re-running a pass that just performed a corrective write
pub const REQUEUE_SOON: Duration = Duration::from_secs(1);

/// Delay before retrying a pass that failed with a retryable error
pub const ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// Default deadline for a single reconcile pass
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(30);

/// Name reported on Kubernetes Events
pub const CONTROLLER_NAME: &str = "jupyterlab-controller";

// =============================================================================
// Outcome
// =============================================================================

/// Result of a successful reconcile pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Live state matches the Jupyterlab; wait for the next change
    Done,
    /// A corrective write was made; run again shortly to continue converging
    RequeueSoon,
}

impl ReconcileOutcome {
    /// Map onto the controller runtime's scheduling action
    pub fn into_action(self) -> Action {
        match self {
            ReconcileOutcome::Done => Action::await_change(),
            ReconcileOutcome::RequeueSoon => Action::requeue(REQUEUE_SOON),
        }
    }
}

// =============================================================================
// Traits for dependency injection and testability
// =============================================================================

/// Kubernetes API operations used by the reconciler
///
/// Gets map 404 to `None`. Creates surface a lost create race as
/// [`Error::AlreadyExists`]; updates surface a stale `resourceVersion` as
/// [`Error::Conflict`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LabKubeClient: Send + Sync {
    /// Get a Jupyterlab
    async fn get_lab(&self, namespace: &str, name: &str) -> Result<Option<Jupyterlab>, Error>;

    /// Get a Deployment
    async fn get_deployment(&self, namespace: &str, name: &str)
        -> Result<Option<Deployment>, Error>;

    /// Get a Service
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>, Error>;

    /// Get a Route
    async fn get_route(&self, namespace: &str, name: &str) -> Result<Option<Route>, Error>;

    /// List pods in `namespace` matching a label selector
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, Error>;

    /// Create a Deployment
    async fn create_deployment(&self, deployment: &Deployment) -> Result<(), Error>;

    /// Create a Service
    async fn create_service(&self, service: &Service) -> Result<(), Error>;

    /// Create a Route
    async fn create_route(&self, route: &Route) -> Result<(), Error>;

    /// Replace a Deployment; must carry the `resourceVersion` it was read at
    async fn update_deployment(&self, deployment: &Deployment) -> Result<(), Error>;

    /// Write the status subresource of `lab`, guarded by its `resourceVersion`
    async fn update_lab_status(
        &self,
        lab: &Jupyterlab,
        status: &JupyterlabStatus,
    ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct LabKubeClientImpl {
    client: Client,
}

impl LabKubeClientImpl {
    /// Create a new LabKubeClientImpl wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get<K>(&self, namespace: &str, name: &str) -> Result<Option<K>, Error>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        Ok(self.api::<K>(namespace).get_opt(name).await?)
    }

    async fn create<K>(&self, obj: &K) -> Result<(), Error>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
    {
        let name = obj.name_any();
        let namespace = namespace_of(obj)?;
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        self.api::<K>(&namespace)
            .create(&params, obj)
            .await
            .map_err(|e| Error::from_api(K::kind(&()), name, e))?;
        Ok(())
    }
}

fn namespace_of<K: Resource>(obj: &K) -> Result<String, Error> {
    obj.namespace().ok_or_else(|| {
        Error::internal_with_context(
            "kube_client",
            format!("{} has no namespace", obj.name_any()),
        )
    })
}

#[async_trait]
impl LabKubeClient for LabKubeClientImpl {
    async fn get_lab(&self, namespace: &str, name: &str) -> Result<Option<Jupyterlab>, Error> {
        self.get(namespace, name).await
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Deployment>, Error> {
        self.get(namespace, name).await
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>, Error> {
        self.get(namespace, name).await
    }

    async fn get_route(&self, namespace: &str, name: &str) -> Result<Option<Route>, Error> {
        self.get(namespace, name).await
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, Error> {
        let list = self
            .api::<Pod>(namespace)
            .list(&ListParams::default().labels(selector))
            .await?;
        Ok(list.items)
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<(), Error> {
        self.create(deployment).await
    }

    async fn create_service(&self, service: &Service) -> Result<(), Error> {
        self.create(service).await
    }

    async fn create_route(&self, route: &Route) -> Result<(), Error> {
        self.create(route).await
    }

    async fn update_deployment(&self, deployment: &Deployment) -> Result<(), Error> {
        let name = deployment.name_any();
        let namespace = namespace_of(deployment)?;
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        self.api::<Deployment>(&namespace)
            .replace(&name, &params, deployment)
            .await
            .map_err(|e| Error::from_api("Deployment", name, e))?;
        Ok(())
    }

    async fn update_lab_status(
        &self,
        lab: &Jupyterlab,
        status: &JupyterlabStatus,
    ) -> Result<(), Error> {
        let name = lab.name_any();
        let namespace = namespace_of(lab)?;
        // A merge patch carrying resourceVersion is rejected with 409 when stale
        let status_patch = serde_json::json!({
            "metadata": { "resourceVersion": lab.resource_version() },
            "status": status,
        });
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        self.api::<Jupyterlab>(&namespace)
            .patch_status(&name, &params, &Patch::Merge(&status_patch))
            .await
            .map_err(|e| Error::from_api("Jupyterlab", name, e))?;
        Ok(())
    }
}

// =============================================================================
// Context
// =============================================================================

/// Shared state for all reconcile passes
pub struct Context {
    /// Kubernetes client for API operations
    pub kube: Arc<dyn LabKubeClient>,
    /// Event publisher for emitting Kubernetes Events
    pub events: Arc<dyn EventPublisher>,
    /// Image, port and route domain stamped on every instance
    pub settings: InstanceSettings,
    /// Whether the cluster serves `route.openshift.io/v1` Routes
    pub routes_enabled: bool,
    /// Deadline for a single pass
    pub reconcile_timeout: Duration,
    /// Cancelled on operator shutdown; in-flight passes are abandoned
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a new Context with the given dependencies
    pub fn new(
        kube: Arc<dyn LabKubeClient>,
        events: Arc<dyn EventPublisher>,
        settings: InstanceSettings,
        routes_enabled: bool,
    ) -> Self {
        Self {
            kube,
            events,
            settings,
            routes_enabled,
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a Context backed by a real Kubernetes client
    pub fn from_client(client: Client, settings: InstanceSettings, routes_enabled: bool) -> Self {
        let events = Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME));
        Self::new(
            Arc::new(LabKubeClientImpl::new(client)),
            events,
            settings,
            routes_enabled,
        )
    }

    /// Set the per-pass deadline
    pub fn with_reconcile_timeout(mut self, timeout: Duration) -> Self {
        self.reconcile_timeout = timeout;
        self
    }

    /// Tie in-flight passes to an operator-wide shutdown token
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Create a context for testing with a mock client
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn LabKubeClient>) -> Self {
        Self::new(
            kube,
            Arc::new(NoopEventPublisher),
            InstanceSettings::default(),
            true,
        )
    }

    async fn publish(
        &self,
        lab: &Jupyterlab,
        type_: EventType,
        reason: &str,
        action: &str,
        note: String,
    ) {
        self.events
            .publish(&lab.object_ref(&()), type_, reason, action, Some(note))
            .await;
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Reconcile a Jupyterlab delivered by the controller runtime
///
/// Reduces the object to its key and runs [`reconcile_key`]; the object
/// itself is not trusted since a fresher copy is fetched.
pub async fn reconcile(lab: Arc<Jupyterlab>, ctx: Arc<Context>) -> Result<Action, Error> {
    let Some(key) = ObjectKey::from_resource(lab.as_ref()) else {
        warn!(jupyterlab = %lab.name_any(), "jupyterlab has no namespace, ignoring");
        return Ok(Action::await_change());
    };
    reconcile_key(&key, &ctx).await.map(ReconcileOutcome::into_action)
}

/// Run one bounded reconcile pass for `key`
///
/// The pass is abandoned with [`Error::Timeout`] once `reconcile_timeout`
/// elapses, or with [`Error::Cancelled`] when the shutdown token fires.
#[instrument(skip(key, ctx), fields(jupyterlab = %key))]
pub async fn reconcile_key(key: &ObjectKey, ctx: &Context) -> Result<ReconcileOutcome, Error> {
    let deadline = ctx.reconcile_timeout;
    tokio::select! {
        biased;
        _ = ctx.shutdown.cancelled() => Err(Error::Cancelled),
        result = tokio::time::timeout(deadline, converge(key, ctx)) => {
            result.unwrap_or(Err(Error::Timeout { elapsed: deadline }))
        }
    }
}

async fn converge(key: &ObjectKey, ctx: &Context) -> Result<ReconcileOutcome, Error> {
    let Some(lab) = ctx.kube.get_lab(&key.namespace, &key.name).await? else {
        debug!("jupyterlab not found, nothing to do");
        return Ok(ReconcileOutcome::Done);
    };

    if let Err(message) = lab.spec.validate() {
        warn!(error = %message, "jupyterlab validation failed");
        ctx.publish(
            &lab,
            EventType::Warning,
            reasons::VALIDATION_FAILED,
            actions::RECONCILE,
            message.clone(),
        )
        .await;
        return Err(Error::validation_for_field(&key.name, "spec.size", message));
    }

    let owner = controller_owner_ref(&lab)?;

    if let Some(outcome) = converge_deployment(&lab, &owner, ctx).await? {
        return Ok(outcome);
    }
    if let Some(outcome) = converge_service(&lab, &owner, ctx).await? {
        return Ok(outcome);
    }
    if ctx.routes_enabled {
        if let Some(outcome) = converge_route(&lab, &owner, ctx).await? {
            return Ok(outcome);
        }
    } else {
        debug!("route API not served, skipping route");
    }

    refresh_status(&lab, ctx).await?;
    Ok(ReconcileOutcome::Done)
}

/// Outcome of a create that may have lost a race with another writer
fn created(result: Result<(), Error>) -> Result<bool, Error> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_already_exists() => {
            debug!(error = %e, "created concurrently, re-reading next pass");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// `Some(outcome)` when a write was made and the pass must stop
///
/// Ownership is not enforced: a same-named Deployment controlled by another
/// owner is still scaled to `spec.size`, and the mismatch is only logged.
async fn converge_deployment(
    lab: &Jupyterlab,
    owner: &OwnerReference,
    ctx: &Context,
) -> Result<Option<ReconcileOutcome>, Error> {
    let name = lab.name_any();
    let namespace = namespace_of(lab)?;
    let desired = lab.spec.size;

    let Some(mut existing) = ctx.kube.get_deployment(&namespace, &name).await? else {
        info!(deployment = %name, replicas = desired, "creating deployment");
        let deployment = deployment_for(lab, owner, &ctx.settings);
        if created(ctx.kube.create_deployment(&deployment).await)? {
            ctx.publish(
                lab,
                EventType::Normal,
                reasons::DEPLOYMENT_CREATED,
                actions::CREATE,
                format!("Created Deployment {name} with {desired} replicas"),
            )
            .await;
        }
        return Ok(Some(ReconcileOutcome::RequeueSoon));
    };

    if !is_controlled_by(&existing, owner) {
        warn!(deployment = %name, "deployment is not controlled by this jupyterlab");
    }

    let current = current_replicas(&existing);
    if current == desired {
        return Ok(None);
    }

    info!(deployment = %name, from = current, to = desired, "scaling deployment");
    existing.spec.get_or_insert_with(Default::default).replicas = Some(desired);
    ctx.kube.update_deployment(&existing).await?;
    ctx.publish(
        lab,
        EventType::Normal,
        reasons::DEPLOYMENT_SCALED,
        actions::SCALE,
        format!("Scaled Deployment {name} from {current} to {desired} replicas"),
    )
    .await;
    Ok(Some(ReconcileOutcome::RequeueSoon))
}

/// Any same-named Service satisfies this step, whoever controls it
async fn converge_service(
    lab: &Jupyterlab,
    owner: &OwnerReference,
    ctx: &Context,
) -> Result<Option<ReconcileOutcome>, Error> {
    let name = lab.name_any();
    let namespace = namespace_of(lab)?;

    if let Some(existing) = ctx.kube.get_service(&namespace, &name).await? {
        if !is_controlled_by(&existing, owner) {
            warn!(service = %name, "service is not controlled by this jupyterlab");
        }
        return Ok(None);
    }

    info!(service = %name, "creating service");
    let service = service_for(lab, owner, &ctx.settings);
    if created(ctx.kube.create_service(&service).await)? {
        ctx.publish(
            lab,
            EventType::Normal,
            reasons::SERVICE_CREATED,
            actions::CREATE,
            format!("Created Service {name}"),
        )
        .await;
    }
    Ok(Some(ReconcileOutcome::RequeueSoon))
}

/// Any same-named Route satisfies this step, whoever controls it
async fn converge_route(
    lab: &Jupyterlab,
    owner: &OwnerReference,
    ctx: &Context,
) -> Result<Option<ReconcileOutcome>, Error> {
    let name = lab.name_any();
    let namespace = namespace_of(lab)?;

    if let Some(existing) = ctx.kube.get_route(&namespace, &name).await? {
        if !is_controlled_by(&existing, owner) {
            warn!(route = %name, "route is not controlled by this jupyterlab");
        }
        return Ok(None);
    }

    let route = route_for(lab, owner, &ctx.settings);
    info!(route = %name, host = ?route.spec.host, "creating route");
    if created(ctx.kube.create_route(&route).await)? {
        ctx.publish(
            lab,
            EventType::Normal,
            reasons::ROUTE_CREATED,
            actions::CREATE,
            format!("Created Route {name}"),
        )
        .await;
    }
    Ok(Some(ReconcileOutcome::RequeueSoon))
}

/// Publish the names of the instance's live pods in `status.nodes`
async fn refresh_status(lab: &Jupyterlab, ctx: &Context) -> Result<(), Error> {
    let name = lab.name_any();
    let namespace = namespace_of(lab)?;

    let pods = ctx.kube.list_pods(&namespace, &selector_for(&name)).await?;
    let observed = JupyterlabStatus::with_nodes(
        pods.iter()
            .filter(|pod| matches_instance(pod.labels(), &name))
            .map(|pod| pod.name_any()),
    );

    let current = lab.status_or_default();
    if observed.node_set() == current.node_set() {
        debug!(nodes = observed.nodes.len(), "status up to date");
        return Ok(());
    }

    info!(nodes = ?observed.nodes, "updating status");
    ctx.kube.update_lab_status(lab, &observed).await?;
    ctx.publish(
        lab,
        EventType::Normal,
        reasons::STATUS_UPDATED,
        actions::RECONCILE,
        format!("Nodes: [{}]", observed.nodes.join(", ")),
    )
    .await;
    Ok(())
}

/// Error policy for the Jupyterlab controller
///
/// - Retryable errors: requeue after [`ERROR_REQUEUE`]
/// - Non-retryable errors: wait for the Jupyterlab to change
///
/// A pass abandoned by shutdown is expected and logged at info.
pub fn error_policy(lab: Arc<Jupyterlab>, error: &Error, _ctx: Arc<Context>) -> Action {
    match error {
        Error::Cancelled => {
            info!(jupyterlab = %lab.name_any(), "reconciliation cancelled by shutdown");
        }
        _ => {
            error!(
                ?error,
                jupyterlab = %lab.name_any(),
                retryable = error.is_retryable(),
                "reconciliation failed"
            );
        }
    }

    if error.is_retryable() {
        Action::requeue(ERROR_REQUEUE)
    } else {
        Action::await_change()
    }
}
