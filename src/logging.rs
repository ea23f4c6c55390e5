use std::collections::VecDeque;

use bevy::prelude::*;

use crate::constants::ANNOUNCEMENT_LOG_CAPACITY;
use crate::messages::AiAnnouncement;

/// Most recent AI announcements, oldest first.
#[derive(Resource, Debug)]
pub struct AnnouncementLog {
    pub messages: VecDeque<AiAnnouncement>,
    pub max_messages: usize,
}

impl Default for AnnouncementLog {
    fn default() -> Self {
        Self::new(ANNOUNCEMENT_LOG_CAPACITY)
    }
}

impl AnnouncementLog {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages,
        }
    }

    pub fn add_message(&mut self, message: AiAnnouncement) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&AiAnnouncement> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn consume_announcements(
    mut reader: MessageReader<AiAnnouncement>,
    mut log: ResMut<AnnouncementLog>,
) {
    for announcement in reader.read() {
        info!("{}", announcement.text);
        log.add_message(announcement.clone());
    }
}
