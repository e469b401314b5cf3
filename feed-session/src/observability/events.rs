//! Canonical structured event names used across `feed-session`.

// Channel lifecycle events.
pub const CHANNEL_CONNECT_START: &str = "channel_connect_start";
pub const CHANNEL_CONNECT_OK: &str = "channel_connect_ok";
pub const CHANNEL_CONNECT_FAILED: &str = "channel_connect_failed";
pub const CHANNEL_DOWN: &str = "channel_down";
pub const CHANNEL_RECONNECT_SCHEDULED: &str = "channel_reconnect_scheduled";
pub const CHANNEL_CLOSED: &str = "channel_closed";
pub const CHANNEL_STALE_EVENT_DROPPED: &str = "channel_stale_event_dropped";

// Egress worker and ingress listener events.
pub const EGRESS_SEND_ATTEMPT: &str = "egress_send_attempt";
pub const EGRESS_SEND_OK: &str = "egress_send_ok";
pub const EGRESS_SEND_FAILED: &str = "egress_send_failed";
pub const EGRESS_QUEUE_CLOSED: &str = "egress_queue_closed";
pub const INGRESS_RECEIVE: &str = "ingress_receive";
pub const INGRESS_ENQUEUE_FAILED: &str = "ingress_enqueue_failed";

// Login events.
pub const LOGIN_REQUEST_SENT: &str = "login_request_sent";
pub const LOGIN_ACCEPTED: &str = "login_accepted";
pub const LOGIN_SUSPECT: &str = "login_suspect";
pub const LOGIN_DENIED: &str = "login_denied";
pub const LOGIN_TIMEOUT: &str = "login_timeout";

// Directory events.
pub const DIRECTORY_REQUEST_SENT: &str = "directory_request_sent";
pub const DIRECTORY_REFRESH_APPLIED: &str = "directory_refresh_applied";
pub const DIRECTORY_UPDATE_IGNORED: &str = "directory_update_ignored";
pub const DIRECTORY_TIMEOUT: &str = "directory_timeout";
pub const DIRECTORY_METADATA_MISMATCH: &str = "directory_metadata_mismatch";
pub const DIRECTORY_CHANNEL_CLEARED: &str = "directory_channel_cleared";
pub const DIRECTORY_IDS_EXHAUSTED: &str = "directory_ids_exhausted";

// Item routing and recovery events.
pub const ITEM_ROUTED: &str = "item_routed";
pub const ITEM_PENDING: &str = "item_pending";
pub const ITEM_STALE_MESSAGE_DROPPED: &str = "item_stale_message_dropped";
pub const ITEM_RECOVERY_START: &str = "item_recovery_start";
pub const ITEM_REQUEST_TIMEOUT: &str = "item_request_timeout";
pub const ITEM_CLOSED: &str = "item_closed";
pub const ITEM_GROUP_MERGED: &str = "item_group_merged";

// Warm standby events.
pub const STANDBY_PROMOTED: &str = "standby_promoted";
pub const STANDBY_SERVICE_ACTIVE: &str = "standby_service_active";
pub const STANDBY_SERVICE_FAILOVER: &str = "standby_service_failover";

// Session and runtime events.
pub const SESSION_CONNECT_OK: &str = "session_connect_ok";
pub const SESSION_CONNECT_FAILED: &str = "session_connect_failed";
pub const SESSION_CLOSE: &str = "session_close";
pub const SEQUENCER_STOPPED: &str = "sequencer_stopped";
pub const DISPATCH_DROP_UNREGISTERED: &str = "dispatch_drop_unregistered";
pub const DISPATCH_QUEUE_CLOSED: &str = "dispatch_queue_closed";
pub const RUNTIME_SPAWN_START: &str = "runtime_spawn_start";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
