//! Session destinations

/// Session topic patterns
pub struct Topics;

impl Topics {
    /// Broadcast status topic
    pub const STATUS: &'static str = "/topic/status";

    /// Broadcast public topic
    pub const PUBLIC: &'static str = "/topic/public";

    /// Heartbeat echo topic
    pub const HEARTBEAT: &'static str = "/topic/heartbeat";

    /// Greeting destination
    pub const HELLO: &'static str = "/app/hello";

    /// Heartbeat destination
    pub const PING: &'static str = "/app/heartbeat";

    const ATTENDANCE_PREFIX: &'static str = "/topic/attendance/";

    /// Attendance topic for an identifier
    pub fn attendance(id: &str) -> String {
        format!("{}{}", Self::ATTENDANCE_PREFIX, id)
    }

    /// Topics subscribed after every connect
    pub fn subscriptions(primary_id: &str, secondary_id: Option<&str>) -> Vec<String> {
        let mut topics = vec![Self::attendance(primary_id)];
        if let Some(secondary) = secondary_id.filter(|s| !s.is_empty() && *s != primary_id) {
            topics.push(Self::attendance(secondary));
        }
        topics.extend([Self::STATUS, Self::PUBLIC, Self::HEARTBEAT].map(String::from));
        topics
    }

    /// Parse an attendance topic to extract the identifier
    pub fn parse_attendance_id(topic: &str) -> Option<&str> {
        topic
            .strip_prefix(Self::ATTENDANCE_PREFIX)
            .filter(|id| !id.is_empty() && !id.contains('/'))
    }

    /// Check if topic is an attendance topic
    pub fn is_attendance_topic(topic: &str) -> bool {
        Self::parse_attendance_id(topic).is_some()
    }
}
