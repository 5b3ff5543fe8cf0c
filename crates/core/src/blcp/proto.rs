//! The protobuf messages of the BLCP channel.
//!
//! Hand-maintained prost structs; field numbers follow the `Rpc.proto` and
//! `Lcm.proto` descriptors embedded in the official client. `RpcMeta` rides
//! in every frame's meta section; the `RpcData` envelope is the body format
//! of the LCM control plane (login, heartbeat).

/// Chunked-transfer bookkeeping, unused by this client but present in the
/// schema
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChunkInfo {
    /// Stream being chunked
    #[prost(int64, tag = "1")]
    pub stream_id: i64,
    /// Index within the stream
    #[prost(int64, tag = "2")]
    pub chunk_id: i64,
}

/// A client-side tracing event attached to request metadata
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventTimestamp {
    /// Event name, e.g. `CLCPReqBegin`
    #[prost(string, tag = "1")]
    pub event: ::prost::alloc::string::String,
    /// Milliseconds since the unix epoch
    #[prost(int64, tag = "2")]
    pub timestamp_ms: i64,
}

/// Metadata of a server-pushed frame
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcNotifyMeta {
    /// Service the push originates from
    #[prost(int64, tag = "1")]
    pub service_id: i64,
    /// Method within the service
    #[prost(int64, tag = "2")]
    pub method_id: i64,
    /// Server-side log id
    #[prost(int64, tag = "3")]
    pub log_id: i64,
    /// Tracing events
    #[prost(message, repeated, tag = "4")]
    pub event_list: ::prost::alloc::vec::Vec<EventTimestamp>,
}

/// Metadata of a request frame
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcRequestMeta {
    /// Target service
    #[prost(int64, tag = "1")]
    pub service_id: i64,
    /// Target method
    #[prost(int64, tag = "2")]
    pub method_id: i64,
    /// Mirrors the correlation id
    #[prost(int64, tag = "3")]
    pub log_id: i64,
    /// Whether the request carries the common device block
    #[prost(int32, tag = "4")]
    pub need_common: i32,
    /// Tracing events
    #[prost(message, repeated, tag = "5")]
    pub event_list: ::prost::alloc::vec::Vec<EventTimestamp>,
}

/// Metadata of a response frame
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcResponseMeta {
    /// Service that answered
    #[prost(int64, tag = "1")]
    pub service_id: i64,
    /// Method that answered
    #[prost(int64, tag = "2")]
    pub method_id: i64,
    /// Mirrors the request's log id
    #[prost(int64, tag = "3")]
    pub log_id: i64,
    /// Zero on success
    #[prost(int32, tag = "4")]
    pub error_code: i32,
    /// `success` on success
    #[prost(string, tag = "5")]
    pub error_text: ::prost::alloc::string::String,
    /// Tracing events
    #[prost(message, repeated, tag = "6")]
    pub event_list: ::prost::alloc::vec::Vec<EventTimestamp>,
}

/// The frame metadata: exactly one of request/response/notify is set
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcMeta {
    /// Set on frames the client sends
    #[prost(message, optional, tag = "1")]
    pub request: ::core::option::Option<RpcRequestMeta>,
    /// Set on replies to a request
    #[prost(message, optional, tag = "2")]
    pub response: ::core::option::Option<RpcResponseMeta>,
    /// 1 when the body is gzip compressed
    #[prost(int32, optional, tag = "3")]
    pub compress_type: ::core::option::Option<i32>,
    /// Random per request, up to 63 bits; responses echo it back
    #[prost(int64, tag = "4")]
    pub correlation_id: i64,
    /// Size of a trailing attachment, unused here
    #[prost(int32, tag = "5")]
    pub attachment_size: i32,
    /// Chunked-transfer bookkeeping, unused here
    #[prost(message, optional, tag = "6")]
    pub chunk_info: ::core::option::Option<ChunkInfo>,
    /// Opaque authentication blob
    #[prost(bytes = "vec", tag = "7")]
    pub authentication_data: ::prost::alloc::vec::Vec<u8>,
    /// Set on server-pushed frames
    #[prost(message, optional, tag = "8")]
    pub notify: ::core::option::Option<RpcNotifyMeta>,
    /// Compression the client is willing to receive (1 = gzip)
    #[prost(int32, tag = "9")]
    pub accept_compress_type: i32,
}

/// The common device block of an LCM request
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LcmCommon {
    /// The device's `cuid_galaxy2`
    #[prost(string, tag = "1")]
    pub cuid: ::prost::alloc::string::String,
    /// Always `android`
    #[prost(string, tag = "2")]
    pub device: ::prost::alloc::string::String,
    /// Android API level
    #[prost(string, tag = "3")]
    pub os_version: ::prost::alloc::string::String,
    /// Device manufacturer, may be empty
    #[prost(string, tag = "4")]
    pub manufacture: ::prost::alloc::string::String,
    /// Device model, may be empty
    #[prost(string, tag = "5")]
    pub model_type: ::prost::alloc::string::String,
    /// The IM app id, decimal
    #[prost(string, tag = "6")]
    pub app_id: ::prost::alloc::string::String,
    /// Host app version
    #[prost(string, tag = "7")]
    pub app_version: ::prost::alloc::string::String,
    /// IM SDK version
    #[prost(string, tag = "8")]
    pub sdk_version: ::prost::alloc::string::String,
    /// Network type, e.g. `wifi`
    #[prost(string, tag = "9")]
    pub network: ::prost::alloc::string::String,
    /// ROM version, may be empty
    #[prost(string, tag = "10")]
    pub rom_version: ::prost::alloc::string::String,
    /// Account key, may be empty
    #[prost(string, tag = "11")]
    pub user_key: ::prost::alloc::string::String,
}

/// A server-initiated LCM action
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LcmNotify {
    /// Server-side log id
    #[prost(int64, tag = "1")]
    pub log_id: i64,
    /// Action discriminator
    #[prost(int32, tag = "2")]
    pub action: i32,
}

/// The LCM login/heartbeat request body
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LcmRequest {
    /// Mirrors the correlation id
    #[prost(int64, tag = "1")]
    pub log_id: i64,
    /// The short-lived LCM token, empty on heartbeats
    #[prost(string, tag = "2")]
    pub token: ::prost::alloc::string::String,
    /// The common device block
    #[prost(message, optional, tag = "3")]
    pub common: ::core::option::Option<LcmCommon>,
    /// Milliseconds since the unix epoch
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
    /// Action discriminator
    #[prost(int32, tag = "5")]
    pub action: i32,
    /// How the app was started; -1 when unknown
    #[prost(int32, tag = "6")]
    pub start_type: i32,
    /// Connection type; 1 for a long connection
    #[prost(int32, tag = "7")]
    pub conn_type: i32,
}

/// The LCM login/heartbeat response body
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LcmResponse {
    /// Mirrors the request's log id
    #[prost(int64, tag = "1")]
    pub log_id: i64,
    /// Zero on success
    #[prost(int32, tag = "2")]
    pub error_code: i32,
    /// `success` on success
    #[prost(string, tag = "3")]
    pub error_msg: ::prost::alloc::string::String,
    /// Suggested heartbeat interval
    #[prost(int64, tag = "4")]
    pub next_interval_ms: i64,
    /// Opaque server info
    #[prost(string, tag = "5")]
    pub server_info: ::prost::alloc::string::String,
}

/// The LCM body envelope: exactly one of the three is set
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcData {
    /// Set on client requests
    #[prost(message, optional, tag = "1")]
    pub lcm_request: ::core::option::Option<LcmRequest>,
    /// Set on server replies
    #[prost(message, optional, tag = "2")]
    pub lcm_response: ::core::option::Option<LcmResponse>,
    /// Set on server pushes
    #[prost(message, optional, tag = "3")]
    pub lcm_notify: ::core::option::Option<LcmNotify>,
}
