// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Nodes: named owners of communication entities.
//!
//! A node is the factory for publishers, subscriptions, services, clients
//! and timers. Each created entity is attached to a callback group: the
//! node's default group unless the caller supplies one of the node's own
//! groups. With intra-process routing enabled, publisher and subscription
//! creation additionally sets up the `__intra` companion handle and
//! registers the entity with the context's intra-process manager.
//!
//! Entity creation must not overlap with a `spin` on the same node; adding
//! or removing the node from an executor with `notify` set wakes the
//! executor so it rebuilds its wait-set.

mod builder;

pub use builder::NodeBuilder;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::callback_group::{CallbackGroup, CallbackGroupKind};
use crate::client::{Client, ClientBase};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::msg::{IntraProcessMessage, Message};
use crate::parameter::{
    Parameter, ParameterDescriptor, ParameterType, ParameterValue, SetParametersResult,
};
use crate::publisher::{Publisher, StoreFn};
use crate::qos::QoS;
use crate::rmw::RmwNode;
use crate::service::{Service, ServiceBase};
use crate::subscription::{IntraTakeFn, MatchesFn, Subscription, SubscriptionBase};
use crate::timer::Timer;

/// Reserved suffix of intra-process companion topics.
///
/// User-visible topic names must not contain it.
pub const INTRA_TOPIC_SUFFIX: &str = "__intra";

/// Options for subscription creation beyond topic, QoS and callback.
#[derive(Default)]
pub struct SubscriptionOptions {
    /// Callback group to attach to; the node's default group when `None`.
    pub group: Option<Arc<CallbackGroup>>,
    /// Ask the transport to suppress samples published by this same node.
    pub ignore_local_publications: bool,
}

#[derive(Default)]
struct EntityCounters {
    publishers: AtomicUsize,
    subscriptions: AtomicUsize,
    services: AtomicUsize,
    clients: AtomicUsize,
    timers: AtomicUsize,
}

/// Named participant owning entities.
pub struct Node {
    name: String,
    context: Arc<Context>,
    rmw_node: Arc<dyn RmwNode>,
    default_group: Arc<CallbackGroup>,
    groups: Mutex<Vec<Weak<CallbackGroup>>>,
    use_intra_process: bool,
    counters: EntityCounters,
    parameters: Mutex<HashMap<String, ParameterValue>>,
}

impl Node {
    /// Start building a node.
    #[must_use]
    pub fn builder(name: &str) -> NodeBuilder {
        NodeBuilder::new(name)
    }

    pub(crate) fn from_parts(
        name: String,
        context: Arc<Context>,
        rmw_node: Arc<dyn RmwNode>,
        use_intra_process: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            context,
            rmw_node,
            default_group: Arc::new(CallbackGroup::new(CallbackGroupKind::MutuallyExclusive)),
            groups: Mutex::new(Vec::new()),
            use_intra_process,
            counters: EntityCounters::default(),
            parameters: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn context(&self) -> Arc<Context> {
        Arc::clone(&self.context)
    }

    #[must_use]
    pub fn use_intra_process(&self) -> bool {
        self.use_intra_process
    }

    /// The group entities land in when no explicit group is given.
    #[must_use]
    pub fn default_callback_group(&self) -> Arc<CallbackGroup> {
        Arc::clone(&self.default_group)
    }

    /// Create an additional callback group owned by this node.
    pub fn create_callback_group(&self, kind: CallbackGroupKind) -> Arc<CallbackGroup> {
        let group = Arc::new(CallbackGroup::new(kind));
        self.groups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::downgrade(&group));
        group
    }

    /// Whether `group` is this node's default group or one it created.
    #[must_use]
    pub fn group_in_node(&self, group: &Arc<CallbackGroup>) -> bool {
        if Arc::ptr_eq(group, &self.default_group) {
            return true;
        }
        self.groups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter_map(Weak::upgrade)
            .any(|candidate| Arc::ptr_eq(&candidate, group))
    }

    /// Default group followed by the live additional groups, in creation
    /// order. Dead entries are pruned.
    #[must_use]
    pub fn callback_groups(&self) -> Vec<Arc<CallbackGroup>> {
        let mut groups = vec![Arc::clone(&self.default_group)];
        let mut list = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        list.retain(|weak| weak.upgrade().is_some());
        groups.extend(list.iter().filter_map(Weak::upgrade));
        groups
    }

    fn resolve_group(&self, group: Option<Arc<CallbackGroup>>) -> Result<Arc<CallbackGroup>> {
        match group {
            Some(group) => {
                if !self.group_in_node(&group) {
                    return Err(Error::GroupNotInNode);
                }
                Ok(group)
            }
            None => Ok(Arc::clone(&self.default_group)),
        }
    }

    /// Create a publisher on `topic`.
    ///
    /// With intra-process routing enabled the publisher also gets a
    /// companion handle and a manager registration, so same-process
    /// subscribers receive the owned message without serialization.
    pub fn create_publisher<M: Message>(
        &self,
        topic: &str,
        qos: QoS,
    ) -> Result<Arc<Publisher<M>>> {
        validate_topic_name(topic)?;
        let handle = self
            .rmw_node
            .create_publisher(topic, M::type_name(), &qos)?;
        let publisher = Arc::new(Publisher::new(topic.to_string(), handle));

        if self.use_intra_process {
            let intra_topic = format!("{}{}", topic, INTRA_TOPIC_SUFFIX);
            let intra_handle =
                self.rmw_node
                    .create_publisher(&intra_topic, IntraProcessMessage::type_name(), &qos)?;

            let manager = self.context.intra_process_manager();
            let id =
                manager.add_publisher(topic, publisher.gid(), qos.depth(), M::type_name());
            let weak_manager = Arc::downgrade(&manager);
            let store: StoreFn = Box::new(move |publisher_id, message, type_name| {
                let Some(manager) = weak_manager.upgrade() else {
                    return Err(Error::IntraProcessUnavailable);
                };
                let Some(message) = message else {
                    return Err(Error::NullMessage);
                };
                manager.store_intra_process_message(publisher_id, message, type_name)
            });
            publisher.setup_intra_process(id, store, intra_handle, Arc::downgrade(&manager));
        }

        self.counters.publishers.fetch_add(1, Ordering::Relaxed);
        log::debug!("[node] '{}' created publisher on '{}'", self.name, topic);
        Ok(publisher)
    }

    /// Create a subscription on `topic` in the default group.
    pub fn create_subscription<M, F>(
        &self,
        topic: &str,
        qos: QoS,
        callback: F,
    ) -> Result<Arc<Subscription<M>>>
    where
        M: Message,
        F: Fn(M) + Send + Sync + 'static,
    {
        self.create_subscription_with_options(topic, qos, callback, SubscriptionOptions::default())
    }

    /// Create a subscription with an explicit group or local-publication
    /// filtering.
    pub fn create_subscription_with_options<M, F>(
        &self,
        topic: &str,
        qos: QoS,
        callback: F,
        options: SubscriptionOptions,
    ) -> Result<Arc<Subscription<M>>>
    where
        M: Message,
        F: Fn(M) + Send + Sync + 'static,
    {
        validate_topic_name(topic)?;
        let group = self.resolve_group(options.group)?;
        let handle = self.rmw_node.create_subscription(
            topic,
            M::type_name(),
            &qos,
            options.ignore_local_publications,
        )?;
        let subscription = Arc::new(Subscription::new(
            topic.to_string(),
            handle,
            Box::new(callback),
        ));

        if self.use_intra_process {
            let intra_topic = format!("{}{}", topic, INTRA_TOPIC_SUFFIX);
            let intra_handle = self.rmw_node.create_subscription(
                &intra_topic,
                IntraProcessMessage::type_name(),
                &qos,
                false,
            )?;

            let manager = self.context.intra_process_manager();
            let id = manager.add_subscription(topic);

            let weak_manager = Arc::downgrade(&manager);
            let take: IntraTakeFn =
                Box::new(move |publisher_id, sequence, subscription_id| {
                    let Some(manager) = weak_manager.upgrade() else {
                        return Err(Error::IntraProcessUnavailable);
                    };
                    manager.take_intra_process_message(publisher_id, sequence, subscription_id)
                });

            let weak_manager = Arc::downgrade(&manager);
            let matches: MatchesFn = Box::new(move |gid| {
                let Some(manager) = weak_manager.upgrade() else {
                    return Err(Error::IntraProcessUnavailable);
                };
                Ok(manager.matches_any_publishers(gid))
            });

            subscription.setup_intra_process(
                id,
                intra_handle,
                take,
                matches,
                Arc::downgrade(&manager),
            );
        }

        let base: Arc<dyn SubscriptionBase> = subscription.clone();
        group.add_subscription(&base);
        self.counters.subscriptions.fetch_add(1, Ordering::Relaxed);
        log::debug!("[node] '{}' created subscription on '{}'", self.name, topic);
        Ok(subscription)
    }

    /// Create a service server in the default group.
    pub fn create_service<Req, Res, F>(
        &self,
        service_name: &str,
        qos: QoS,
        callback: F,
    ) -> Result<Arc<Service<Req, Res>>>
    where
        Req: Message,
        Res: Message,
        F: Fn(Req) -> Res + Send + Sync + 'static,
    {
        self.create_service_in_group(service_name, qos, callback, None)
    }

    /// Create a service server in an explicit group (`None` = default).
    pub fn create_service_in_group<Req, Res, F>(
        &self,
        service_name: &str,
        qos: QoS,
        callback: F,
        group: Option<Arc<CallbackGroup>>,
    ) -> Result<Arc<Service<Req, Res>>>
    where
        Req: Message,
        Res: Message,
        F: Fn(Req) -> Res + Send + Sync + 'static,
    {
        let group = self.resolve_group(group)?;
        let handle = self.rmw_node.create_service(service_name, &qos)?;
        let service = Arc::new(Service::new(
            service_name.to_string(),
            handle,
            Box::new(callback),
        ));
        group.add_service(service.clone() as Arc<dyn ServiceBase>);
        self.counters.services.fetch_add(1, Ordering::Relaxed);
        log::debug!("[node] '{}' created service '{}'", self.name, service_name);
        Ok(service)
    }

    /// Create a service client in the default group.
    pub fn create_client<Req, Res>(
        &self,
        service_name: &str,
        qos: QoS,
    ) -> Result<Arc<Client<Req, Res>>>
    where
        Req: Message,
        Res: Message,
    {
        self.create_client_in_group(service_name, qos, None)
    }

    /// Create a service client in an explicit group (`None` = default).
    pub fn create_client_in_group<Req, Res>(
        &self,
        service_name: &str,
        qos: QoS,
        group: Option<Arc<CallbackGroup>>,
    ) -> Result<Arc<Client<Req, Res>>>
    where
        Req: Message,
        Res: Message,
    {
        let group = self.resolve_group(group)?;
        let handle = self.rmw_node.create_client(service_name, &qos)?;
        let client = Arc::new(Client::new(service_name.to_string(), handle));
        group.add_client(client.clone() as Arc<dyn ClientBase>);
        self.counters.clients.fetch_add(1, Ordering::Relaxed);
        log::debug!("[node] '{}' created client for '{}'", self.name, service_name);
        Ok(client)
    }

    /// Create a periodic timer in the default group.
    pub fn create_timer<F>(&self, period: Duration, callback: F) -> Result<Arc<Timer>>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.create_timer_in_group(period, callback, None)
    }

    /// Create a periodic timer in an explicit group (`None` = default).
    pub fn create_timer_in_group<F>(
        &self,
        period: Duration,
        callback: F,
        group: Option<Arc<CallbackGroup>>,
    ) -> Result<Arc<Timer>>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let group = self.resolve_group(group)?;
        let timer = Arc::new(Timer::new(period, Box::new(callback)));
        group.add_timer(&timer);
        self.counters.timers.fetch_add(1, Ordering::Relaxed);
        Ok(timer)
    }

    /// Set parameters one by one, returning one result per parameter.
    ///
    /// Setting a parameter to `ParameterValue::NotSet` removes it. An empty
    /// name is rejected without affecting the rest of the batch.
    pub fn set_parameters(&self, parameters: Vec<Parameter>) -> Vec<SetParametersResult> {
        let mut map = self.parameters.lock().unwrap_or_else(|e| e.into_inner());
        parameters
            .into_iter()
            .map(|parameter| apply_parameter(&mut map, parameter))
            .collect()
    }

    /// Set a batch of parameters all-or-nothing.
    pub fn set_parameters_atomically(&self, parameters: Vec<Parameter>) -> SetParametersResult {
        if parameters.iter().any(|p| p.name.is_empty()) {
            return SetParametersResult::rejected("parameter name must not be empty");
        }
        let mut map = self.parameters.lock().unwrap_or_else(|e| e.into_inner());
        for parameter in parameters {
            apply_parameter(&mut map, parameter);
        }
        SetParametersResult::ok()
    }

    /// Current value of one parameter; `NotSet` when absent.
    #[must_use]
    pub fn get_parameter(&self, name: &str) -> ParameterValue {
        self.parameters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .unwrap_or(ParameterValue::NotSet)
    }

    /// Current values in request order; absent names yield `NotSet`.
    #[must_use]
    pub fn get_parameters(&self, names: &[String]) -> Vec<ParameterValue> {
        let map = self.parameters.lock().unwrap_or_else(|e| e.into_inner());
        names
            .iter()
            .map(|name| map.get(name).cloned().unwrap_or(ParameterValue::NotSet))
            .collect()
    }

    /// Runtime types in request order; absent names yield `NotSet`.
    #[must_use]
    pub fn get_parameter_types(&self, names: &[String]) -> Vec<ParameterType> {
        let map = self.parameters.lock().unwrap_or_else(|e| e.into_inner());
        names
            .iter()
            .map(|name| {
                map.get(name)
                    .map(ParameterValue::kind)
                    .unwrap_or(ParameterType::NotSet)
            })
            .collect()
    }

    /// Sorted names of parameters matching any of `prefixes` (all names
    /// when `prefixes` is empty).
    #[must_use]
    pub fn list_parameters(&self, prefixes: &[String]) -> Vec<String> {
        let map = self.parameters.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = map
            .keys()
            .filter(|name| {
                prefixes.is_empty() || prefixes.iter().any(|prefix| name.starts_with(prefix))
            })
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Descriptors in request order.
    #[must_use]
    pub fn describe_parameters(&self, names: &[String]) -> Vec<ParameterDescriptor> {
        let map = self.parameters.lock().unwrap_or_else(|e| e.into_inner());
        names
            .iter()
            .map(|name| ParameterDescriptor {
                name: name.clone(),
                kind: map
                    .get(name)
                    .map(ParameterValue::kind)
                    .unwrap_or(ParameterType::NotSet),
            })
            .collect()
    }

    #[must_use]
    pub fn number_of_publishers(&self) -> usize {
        self.counters.publishers.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn number_of_subscriptions(&self) -> usize {
        self.counters.subscriptions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn number_of_services(&self) -> usize {
        self.counters.services.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn number_of_clients(&self) -> usize {
        self.counters.clients.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn number_of_timers(&self) -> usize {
        self.counters.timers.load(Ordering::Relaxed)
    }
}

fn apply_parameter(
    map: &mut HashMap<String, ParameterValue>,
    parameter: Parameter,
) -> SetParametersResult {
    if parameter.name.is_empty() {
        return SetParametersResult::rejected("parameter name must not be empty");
    }
    match parameter.value {
        ParameterValue::NotSet => {
            map.remove(&parameter.name);
        }
        value => {
            map.insert(parameter.name, value);
        }
    }
    SetParametersResult::ok()
}

fn validate_topic_name(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(Error::InvalidTopicName(topic.to_string()));
    }
    if topic.contains(INTRA_TOPIC_SUFFIX) {
        return Err(Error::InvalidTopicName(topic.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_config::EnvConfig;

    fn test_node(intra: bool) -> Arc<Node> {
        Node::builder("test_node")
            .context(Context::with_loopback(EnvConfig::default()))
            .use_intra_process(intra)
            .build()
            .expect("node creation should succeed")
    }

    #[test]
    fn test_create_entities_bumps_counters() {
        let node = test_node(false);

        let _publisher = node
            .create_publisher::<i64>("out", QoS::default())
            .expect("publisher creation should succeed");
        let _subscription = node
            .create_subscription("in", QoS::default(), |_msg: i64| {})
            .expect("subscription creation should succeed");
        let _timer = node
            .create_timer(Duration::from_millis(100), || {})
            .expect("timer creation should succeed");

        assert_eq!(node.number_of_publishers(), 1);
        assert_eq!(node.number_of_subscriptions(), 1);
        assert_eq!(node.number_of_timers(), 1);
    }

    #[test]
    fn test_reserved_suffix_rejected() {
        let node = test_node(false);
        let result = node.create_publisher::<i64>("data__intra", QoS::default());
        assert!(matches!(result, Err(Error::InvalidTopicName(_))));
    }

    #[test]
    fn test_alien_group_rejected() {
        let node = test_node(false);
        let other = test_node(false);
        let alien_group = other.create_callback_group(CallbackGroupKind::Reentrant);

        let result = node.create_timer_in_group(
            Duration::from_millis(100),
            || {},
            Some(alien_group),
        );
        assert!(matches!(result, Err(Error::GroupNotInNode)));
    }

    #[test]
    fn test_own_group_accepted() {
        let node = test_node(false);
        let group = node.create_callback_group(CallbackGroupKind::Reentrant);
        assert!(node.group_in_node(&group));

        let timer = node
            .create_timer_in_group(Duration::from_millis(100), || {}, Some(group.clone()))
            .expect("timer creation should succeed");
        assert!(group
            .timers()
            .iter()
            .any(|candidate| Arc::ptr_eq(candidate, &timer)));
    }

    #[test]
    fn test_intra_process_ids_assigned() {
        let node = test_node(true);

        let publisher = node
            .create_publisher::<i64>("data", QoS::default())
            .expect("publisher creation should succeed");
        let subscription = node
            .create_subscription("data", QoS::default(), |_msg: i64| {})
            .expect("subscription creation should succeed");

        let publisher_id = publisher.intra_process_id().expect("id should be assigned");
        let subscription_id = subscription
            .intra_process_id()
            .expect("id should be assigned");
        assert_ne!(publisher_id, 0);
        assert_ne!(subscription_id, 0);
        assert_ne!(publisher_id, subscription_id);
    }

    #[test]
    fn test_intra_disabled_assigns_no_ids() {
        let node = test_node(false);
        let publisher = node
            .create_publisher::<i64>("data", QoS::default())
            .expect("publisher creation should succeed");
        assert!(publisher.intra_process_id().is_none());
    }

    #[test]
    fn test_parameters_set_get_list() {
        let node = test_node(false);

        let results = node.set_parameters(vec![
            Parameter::new("rate", ParameterValue::Double(50.0)),
            Parameter::new("", ParameterValue::Bool(true)),
            Parameter::new("frame", ParameterValue::String("map".to_string())),
        ]);
        assert!(results[0].successful);
        assert!(!results[1].successful);
        assert!(results[2].successful);

        assert_eq!(node.get_parameter("rate"), ParameterValue::Double(50.0));
        assert_eq!(node.get_parameter("missing"), ParameterValue::NotSet);
        assert_eq!(node.list_parameters(&[]), vec!["frame", "rate"]);
        assert_eq!(
            node.list_parameters(&["fr".to_string()]),
            vec!["frame"]
        );
    }

    #[test]
    fn test_parameter_not_set_removes() {
        let node = test_node(false);
        node.set_parameters(vec![Parameter::new("rate", ParameterValue::Integer(10))]);
        node.set_parameters(vec![Parameter::new("rate", ParameterValue::NotSet)]);
        assert_eq!(node.get_parameter("rate"), ParameterValue::NotSet);
        assert!(node.list_parameters(&[]).is_empty());
    }

    #[test]
    fn test_set_parameters_atomically_rejects_batch() {
        let node = test_node(false);
        let result = node.set_parameters_atomically(vec![
            Parameter::new("good", ParameterValue::Bool(true)),
            Parameter::new("", ParameterValue::Bool(true)),
        ]);
        assert!(!result.successful);
        assert_eq!(node.get_parameter("good"), ParameterValue::NotSet);
    }

    #[test]
    fn test_callback_groups_starts_with_default() {
        let node = test_node(false);
        let extra = node.create_callback_group(CallbackGroupKind::Reentrant);

        let groups = node.callback_groups();
        assert_eq!(groups.len(), 2);
        assert!(Arc::ptr_eq(&groups[0], &node.default_callback_group()));
        assert!(Arc::ptr_eq(&groups[1], &extra));
    }
}
