// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service exposure of a node's parameters.

use std::sync::{Arc, Weak};

use super::{
    DescribeParametersRequest, DescribeParametersResponse, GetParameterTypesRequest,
    GetParameterTypesResponse, GetParametersRequest, GetParametersResponse,
    ListParametersRequest, ListParametersResponse, SetParametersAtomicallyResponse,
    SetParametersRequest, SetParametersResponse, SetParametersResult,
};
use crate::error::Result;
use crate::node::Node;
use crate::service::Service;

/// Exposes a node's parameter map over six services, named
/// `<node>__get_parameters`, `__get_parameter_types`, `__set_parameters`,
/// `__set_parameters_atomically`, `__list_parameters` and
/// `__describe_parameters`.
///
/// Handlers hold the node weakly; once the node is gone they answer with
/// empty responses until the service itself is dropped.
pub struct ParameterService {
    _get_parameters: Arc<Service<GetParametersRequest, GetParametersResponse>>,
    _get_parameter_types: Arc<Service<GetParameterTypesRequest, GetParameterTypesResponse>>,
    _set_parameters: Arc<Service<SetParametersRequest, SetParametersResponse>>,
    _set_parameters_atomically:
        Arc<Service<SetParametersRequest, SetParametersAtomicallyResponse>>,
    _list_parameters: Arc<Service<ListParametersRequest, ListParametersResponse>>,
    _describe_parameters: Arc<Service<DescribeParametersRequest, DescribeParametersResponse>>,
}

impl ParameterService {
    /// Create the six parameter services on `node`'s default group, using
    /// the context's configured default QoS.
    pub fn new(node: &Arc<Node>) -> Result<Self> {
        let qos = node.context().default_qos();

        let weak = Arc::downgrade(node);
        let get_parameters = node.create_service(
            &format!("{}__get_parameters", node.name()),
            qos,
            move |request: GetParametersRequest| {
                let Some(node) = Weak::upgrade(&weak) else {
                    return GetParametersResponse::default();
                };
                GetParametersResponse {
                    values: node.get_parameters(&request.names),
                }
            },
        )?;

        let weak = Arc::downgrade(node);
        let get_parameter_types = node.create_service(
            &format!("{}__get_parameter_types", node.name()),
            qos,
            move |request: GetParameterTypesRequest| {
                let Some(node) = Weak::upgrade(&weak) else {
                    return GetParameterTypesResponse::default();
                };
                GetParameterTypesResponse {
                    types: node.get_parameter_types(&request.names),
                }
            },
        )?;

        let weak = Arc::downgrade(node);
        let set_parameters = node.create_service(
            &format!("{}__set_parameters", node.name()),
            qos,
            move |request: SetParametersRequest| {
                let Some(node) = Weak::upgrade(&weak) else {
                    return SetParametersResponse::default();
                };
                SetParametersResponse {
                    results: node.set_parameters(request.parameters),
                }
            },
        )?;

        let weak = Arc::downgrade(node);
        let set_parameters_atomically = node.create_service(
            &format!("{}__set_parameters_atomically", node.name()),
            qos,
            move |request: SetParametersRequest| {
                let Some(node) = Weak::upgrade(&weak) else {
                    return SetParametersAtomicallyResponse {
                        result: SetParametersResult::rejected("node is gone"),
                    };
                };
                SetParametersAtomicallyResponse {
                    result: node.set_parameters_atomically(request.parameters),
                }
            },
        )?;

        let weak = Arc::downgrade(node);
        let list_parameters = node.create_service(
            &format!("{}__list_parameters", node.name()),
            qos,
            move |request: ListParametersRequest| {
                let Some(node) = Weak::upgrade(&weak) else {
                    return ListParametersResponse::default();
                };
                ListParametersResponse {
                    names: node.list_parameters(&request.prefixes),
                }
            },
        )?;

        let weak = Arc::downgrade(node);
        let describe_parameters = node.create_service(
            &format!("{}__describe_parameters", node.name()),
            qos,
            move |request: DescribeParametersRequest| {
                let Some(node) = Weak::upgrade(&weak) else {
                    return DescribeParametersResponse::default();
                };
                DescribeParametersResponse {
                    descriptors: node.describe_parameters(&request.names),
                }
            },
        )?;

        Ok(Self {
            _get_parameters: get_parameters,
            _get_parameter_types: get_parameter_types,
            _set_parameters: set_parameters,
            _set_parameters_atomically: set_parameters_atomically,
            _list_parameters: list_parameters,
            _describe_parameters: describe_parameters,
        })
    }
}
