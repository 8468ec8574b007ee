//! Wire messages exchanged with the engine.
//!
//! Every call is one `Request` carrying exactly one operation, answered by
//! one `Response`. Strict rows carry type tags plus a tagged value buffer;
//! inferred rows carry literals only.

pub mod google {
    pub mod rpc {
        /// Canonical status codes, numbered as in `google.rpc.Code`.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Code {
            Ok = 0,
            Cancelled = 1,
            Unknown = 2,
            InvalidArgument = 3,
            DeadlineExceeded = 4,
            NotFound = 5,
            AlreadyExists = 6,
            PermissionDenied = 7,
            ResourceExhausted = 8,
            FailedPrecondition = 9,
            Aborted = 10,
            OutOfRange = 11,
            Unimplemented = 12,
            Internal = 13,
            Unavailable = 14,
            DataLoss = 15,
            Unauthenticated = 16,
        }

        impl Code {
            /// The name used in the protobuf definition.
            #[must_use]
            pub const fn as_str_name(self) -> &'static str {
                match self {
                    Self::Ok => "OK",
                    Self::Cancelled => "CANCELLED",
                    Self::Unknown => "UNKNOWN",
                    Self::InvalidArgument => "INVALID_ARGUMENT",
                    Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
                    Self::NotFound => "NOT_FOUND",
                    Self::AlreadyExists => "ALREADY_EXISTS",
                    Self::PermissionDenied => "PERMISSION_DENIED",
                    Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
                    Self::FailedPrecondition => "FAILED_PRECONDITION",
                    Self::Aborted => "ABORTED",
                    Self::OutOfRange => "OUT_OF_RANGE",
                    Self::Unimplemented => "UNIMPLEMENTED",
                    Self::Internal => "INTERNAL",
                    Self::Unavailable => "UNAVAILABLE",
                    Self::DataLoss => "DATA_LOSS",
                    Self::Unauthenticated => "UNAUTHENTICATED",
                }
            }
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Status {
            #[prost(enumeration = "Code", tag = "1")]
            pub code: i32,
            #[prost(string, tag = "2")]
            pub message: ::prost::alloc::string::String,
        }
    }
}

/// One row of a record-based write.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Row {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(string, repeated, tag = "2")]
    pub measurements: Vec<String>,
    /// Declared type tags; empty for inferred rows.
    #[prost(int32, repeated, tag = "3")]
    pub types: Vec<i32>,
    /// Tagged values; empty for inferred rows.
    #[prost(bytes = "vec", tag = "4")]
    pub values: Vec<u8>,
    /// Canonical literals; empty for strict rows.
    #[prost(string, repeated, tag = "5")]
    pub literals: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InsertRecordRequest {
    #[prost(string, tag = "1")]
    pub device: String,
    #[prost(message, optional, tag = "2")]
    pub row: Option<Row>,
    #[prost(bool, tag = "3")]
    pub inferred: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InsertRecordsRequest {
    #[prost(string, repeated, tag = "1")]
    pub devices: Vec<String>,
    #[prost(message, repeated, tag = "2")]
    pub rows: Vec<Row>,
    #[prost(bool, tag = "3")]
    pub inferred: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InsertRecordsOfOneDeviceRequest {
    #[prost(string, tag = "1")]
    pub device: String,
    #[prost(message, repeated, tag = "2")]
    pub rows: Vec<Row>,
    #[prost(bool, tag = "3")]
    pub inferred: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TabletColumn {
    #[prost(string, tag = "1")]
    pub measurement: String,
    #[prost(int32, tag = "2")]
    pub data_type: i32,
    /// Non-null values, untagged, in row order.
    #[prost(bytes = "vec", tag = "3")]
    pub values: Vec<u8>,
    /// One bit per row, least significant bit first; a set bit is null.
    #[prost(bytes = "vec", tag = "4")]
    pub null_bitmap: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InsertTabletRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub device: String,
    #[prost(int64, repeated, tag = "3")]
    pub timestamps: Vec<i64>,
    #[prost(message, repeated, tag = "4")]
    pub columns: Vec<TabletColumn>,
    #[prost(uint32, tag = "5")]
    pub row_count: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InsertTabletsRequest {
    #[prost(message, repeated, tag = "1")]
    pub tablets: Vec<InsertTabletRequest>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CountRowsRequest {
    /// A device path, or a prefix followed by `.**`.
    #[prost(string, tag = "1")]
    pub target: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteDataRequest {
    #[prost(string, tag = "1")]
    pub device: String,
    #[prost(int64, tag = "2")]
    pub before_timestamp: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateNamespaceRequest {
    #[prost(string, tag = "1")]
    pub namespace: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DropNamespaceRequest {
    #[prost(string, tag = "1")]
    pub namespace: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnDeclaration {
    #[prost(string, tag = "1")]
    pub measurement: String,
    #[prost(int32, tag = "2")]
    pub data_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeclareColumnsRequest {
    #[prost(string, tag = "1")]
    pub device: String,
    #[prost(message, repeated, tag = "2")]
    pub columns: Vec<ColumnDeclaration>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(uint32, tag = "1")]
    pub request_id: u32,
    #[prost(oneof = "request::Payload", tags = "2, 3, 4, 5, 6, 7, 8, 9, 10")]
    pub payload: Option<request::Payload>,
}

pub mod request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        InsertRecord(super::InsertRecordRequest),
        #[prost(message, tag = "3")]
        InsertRecords(super::InsertRecordsRequest),
        #[prost(message, tag = "4")]
        InsertRecordsOfOneDevice(super::InsertRecordsOfOneDeviceRequest),
        #[prost(message, tag = "5")]
        InsertTablets(super::InsertTabletsRequest),
        #[prost(message, tag = "6")]
        CountRows(super::CountRowsRequest),
        #[prost(message, tag = "7")]
        DeleteData(super::DeleteDataRequest),
        #[prost(message, tag = "8")]
        CreateNamespace(super::CreateNamespaceRequest),
        #[prost(message, tag = "9")]
        DropNamespace(super::DropNamespaceRequest),
        #[prost(message, tag = "10")]
        DeclareColumns(super::DeclareColumnsRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(uint32, tag = "1")]
    pub request_id: u32,
    #[prost(message, optional, tag = "2")]
    pub status: Option<google::rpc::Status>,
    /// Result of a count; zero for other operations.
    #[prost(int64, tag = "3")]
    pub count: i64,
}
