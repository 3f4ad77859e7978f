//! A scripted in-memory backend for exercising sessions without libaom.

use std::{cell::RefCell, rc::Rc, slice};

use aom_dispatch::Controls;

use super::{Backend, BackendContext, BackendResult, Control, FrameFlags, FramePacket, Packet};
use crate::{config::BackendConfig, error::BackendError, pool::FrameBuffer, settings::Usage};

/// Everything the backend was asked to do.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub inits: Vec<BackendConfig>,
    pub config_sets: Vec<BackendConfig>,
    pub controls: Vec<(Control, i32)>,
    /// pts and buffer address of every accepted frame.
    pub encodes: Vec<(i64, usize)>,
    pub header_requests: usize,
    pub destroyed: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Frame { flags: FrameFlags, size: usize },
    Other(i32),
}

/// What the backend does.
#[derive(Clone)]
pub(crate) struct Script {
    pub defaults: BackendConfig,
    pub fail_init: bool,
    /// Rejects any config with a bitrate above this.
    pub max_bitrate: Option<u32>,
    pub unsupported: Controls,
    pub failing: Controls,
    pub fail_encode_at: Option<i64>,
    pub headers: Option<Vec<u8>>,
    /// Output of one encode call for a given pts.
    pub output: fn(i64) -> Vec<Scripted>,
}

fn key_then_references(pts: i64) -> Vec<Scripted> {
    let flags = if pts == 0 {
        FrameFlags::KEY
    } else {
        FrameFlags::empty()
    };
    vec![Scripted::Frame { flags, size: 100 }]
}

impl Default for Script {
    fn default() -> Self {
        Self {
            defaults: crate::config::tests::defaults(),
            fail_init: false,
            max_bitrate: None,
            unsupported: Controls::empty(),
            failing: Controls::empty(),
            fail_encode_at: None,
            headers: Some(vec![0x0a, 0x0b, 0x00, 0x00]),
            output: key_then_references,
        }
    }
}

pub(crate) struct MockBackend {
    pub script: Script,
    pub journal: Rc<RefCell<Journal>>,
}

impl MockBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            journal: Rc::default(),
        }
    }
}

impl Backend for MockBackend {
    type Context = MockContext;

    fn defaults(&self, usage: Usage) -> BackendResult<BackendConfig> {
        Ok(BackendConfig {
            usage,
            ..self.script.defaults.clone()
        })
    }

    fn init(&self, config: &BackendConfig) -> BackendResult<MockContext> {
        self.journal.borrow_mut().inits.push(config.clone());
        if self.script.fail_init {
            return Err(BackendError::new(Some(3), "ABI version mismatch"));
        }
        Ok(MockContext {
            script: self.script.clone(),
            journal: self.journal.clone(),
            pending: vec![],
        })
    }
}

pub(crate) struct MockContext {
    script: Script,
    journal: Rc<RefCell<Journal>>,
    pending: Vec<(Scripted, i64, Vec<u8>)>,
}

impl Drop for MockContext {
    fn drop(&mut self) {
        self.journal.borrow_mut().destroyed = true;
    }
}

pub(crate) struct MockPackets<'a> {
    iter: slice::Iter<'a, (Scripted, i64, Vec<u8>)>,
}

impl<'a> Iterator for MockPackets<'a> {
    type Item = Packet<'a>;

    fn next(&mut self) -> Option<Packet<'a>> {
        let (scripted, pts, data) = self.iter.next()?;
        Some(match scripted {
            Scripted::Frame { flags, .. } => Packet::Frame(FramePacket {
                data,
                pts: *pts,
                duration: 1,
                flags: *flags,
            }),
            Scripted::Other(kind) => Packet::Other(*kind),
        })
    }
}

impl BackendContext for MockContext {
    type Packets<'a> = MockPackets<'a>;

    fn set_config(&mut self, config: &BackendConfig) -> BackendResult<()> {
        self.journal.borrow_mut().config_sets.push(config.clone());
        match self.script.max_bitrate {
            Some(max) if config.target_bitrate > max => {
                Err(BackendError::new(Some(8), "Invalid parameter")
                    .with_detail("rc_target_bitrate out of range"))
            }
            _ => Ok(()),
        }
    }

    fn supports(&self, control: Control) -> bool {
        !self.script.unsupported.supports(control)
    }

    fn control(&mut self, control: Control, value: i32) -> BackendResult<()> {
        self.journal.borrow_mut().controls.push((control, value));
        if self.script.failing.supports(control) {
            return Err(BackendError::new(Some(8), "Invalid parameter"));
        }
        Ok(())
    }

    fn global_headers(&mut self) -> BackendResult<Option<Vec<u8>>> {
        self.journal.borrow_mut().header_requests += 1;
        Ok(self.script.headers.clone())
    }

    fn encode(&mut self, buffer: &mut FrameBuffer, pts: i64, _duration: u64) -> BackendResult<()> {
        if self.script.fail_encode_at == Some(pts) {
            return Err(BackendError::new(Some(1), "Unspecified internal error"));
        }
        self.journal
            .borrow_mut()
            .encodes
            .push((pts, buffer.data().as_ptr() as usize));

        self.pending = (self.script.output)(pts)
            .into_iter()
            .map(|scripted| {
                let data = match &scripted {
                    Scripted::Frame { size, .. } => vec![pts as u8; *size],
                    Scripted::Other(_) => vec![],
                };
                (scripted, pts, data)
            })
            .collect();
        Ok(())
    }

    fn packets(&mut self) -> MockPackets<'_> {
        MockPackets {
            iter: self.pending.iter(),
        }
    }
}
