use prost::Message;

use crate::catalog::ColumnSchema;
use crate::proto::google::rpc::Code;
use crate::proto::{self, request};
use crate::session::{ProtocolError, Session, SessionError, Transport, frame};
use crate::types::{DeviceId, Namespace};

/// A `Session` that sends framed protobuf requests over a `Transport`.
pub struct RemoteSession<T: Transport> {
    transport: T,
    next_request_id: u32,
}

impl<T: Transport> RemoteSession<T> {
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            next_request_id: 1,
        }
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send one request and wait for its response.
    ///
    /// Returns the response only if its status is OK.
    fn call(&mut self, payload: request::Payload) -> Result<proto::Response, SessionError> {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);

        let request = proto::Request {
            request_id,
            payload: Some(payload),
        };
        let frame = frame::encode(&request.encode_to_vec()).map_err(ProtocolError::Frame)?;
        tracing::debug!("sending request {request_id} ({} bytes)", frame.len());

        let reply = self.transport.round_trip(&frame)?;
        let body = frame::decode(&reply).map_err(ProtocolError::Frame)?;
        let response = proto::Response::decode(body).map_err(ProtocolError::Decode)?;
        if response.request_id != request_id {
            return Err(ProtocolError::RequestIdMismatch {
                sent: request_id,
                received: response.request_id,
            }
            .into());
        }

        let status = response.status.as_ref().ok_or(ProtocolError::MissingStatus)?;
        let code = Code::try_from(status.code)
            .map_err(|_| ProtocolError::UnknownStatusCode(status.code))?;
        if code != Code::Ok {
            tracing::debug!(
                "request {request_id} failed with {}: {}",
                code.as_str_name(),
                status.message
            );
            return Err(SessionError::Execution {
                code,
                message: status.message.clone(),
            });
        }
        Ok(response)
    }
}

impl<T: Transport> Session for RemoteSession<T> {
    fn write_single_record(
        &mut self,
        request: proto::InsertRecordRequest,
    ) -> Result<(), SessionError> {
        self.call(request::Payload::InsertRecord(request)).map(drop)
    }

    fn write_multi_record(
        &mut self,
        request: proto::InsertRecordsRequest,
    ) -> Result<(), SessionError> {
        self.call(request::Payload::InsertRecords(request)).map(drop)
    }

    fn write_one_device_batch(
        &mut self,
        request: proto::InsertRecordsOfOneDeviceRequest,
    ) -> Result<(), SessionError> {
        self.call(request::Payload::InsertRecordsOfOneDevice(request))
            .map(drop)
    }

    fn write_columnar_batch(
        &mut self,
        request: proto::InsertTabletsRequest,
    ) -> Result<(), SessionError> {
        self.call(request::Payload::InsertTablets(request)).map(drop)
    }

    fn count_rows(&mut self, target: &str) -> Result<u64, SessionError> {
        let response = self.call(request::Payload::CountRows(proto::CountRowsRequest {
            target: target.to_string(),
        }))?;
        u64::try_from(response.count)
            .map_err(|_| ProtocolError::NegativeCount(response.count).into())
    }

    fn delete_all_data(&mut self, device: &DeviceId, before: i64) -> Result<(), SessionError> {
        self.call(request::Payload::DeleteData(proto::DeleteDataRequest {
            device: device.to_string(),
            before_timestamp: before,
        }))
        .map(drop)
    }

    fn create_namespace(&mut self, namespace: &Namespace) -> Result<(), SessionError> {
        self.call(request::Payload::CreateNamespace(
            proto::CreateNamespaceRequest {
                namespace: namespace.to_string(),
            },
        ))
        .map(drop)
    }

    fn drop_namespace(&mut self, namespace: &Namespace) -> Result<(), SessionError> {
        self.call(request::Payload::DropNamespace(proto::DropNamespaceRequest {
            namespace: namespace.to_string(),
        }))
        .map(drop)
    }

    fn declare_columns(
        &mut self,
        device: &DeviceId,
        schema: &ColumnSchema,
    ) -> Result<(), SessionError> {
        self.call(request::Payload::DeclareColumns(
            proto::DeclareColumnsRequest {
                device: device.to_string(),
                columns: schema
                    .columns()
                    .iter()
                    .map(|c| proto::ColumnDeclaration {
                        measurement: c.name.clone(),
                        data_type: i32::from(c.ty.tag()),
                    })
                    .collect(),
            },
        ))
        .map(drop)
    }
}
