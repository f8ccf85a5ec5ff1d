// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use tokio::sync::{mpsc, oneshot};

use super::CharacteristicId;
use crate::{Error, Result};

/// A request from a remote central, as delivered by the stack to the emulator's event loop. Each
/// request carries the channel its outcome is reported on.
#[derive(Debug)]
pub enum StackRequest {
    Read {
        characteristic: CharacteristicId,
        responder: oneshot::Sender<Result<Vec<u8>>>,
    },
    Write {
        characteristic: CharacteristicId,
        value: Vec<u8>,
        responder: oneshot::Sender<Result<()>>,
    },
    StartNotify {
        characteristic: CharacteristicId,
        responder: oneshot::Sender<Result<()>>,
    },
    StopNotify {
        characteristic: CharacteristicId,
        responder: oneshot::Sender<Result<()>>,
    },
}

impl StackRequest {
    pub fn characteristic(&self) -> &CharacteristicId {
        match self {
            StackRequest::Read { characteristic, .. }
            | StackRequest::Write { characteristic, .. }
            | StackRequest::StartNotify { characteristic, .. }
            | StackRequest::StopNotify { characteristic, .. } => characteristic,
        }
    }
}

/// The sending half of the emulator's request channel. Stacks hold one of these and use it to
/// forward central requests; every method waits for the emulator to handle the request.
#[derive(Clone, Debug)]
pub struct RequestSender {
    tx: mpsc::Sender<StackRequest>,
}

impl RequestSender {
    pub(crate) fn new(tx: mpsc::Sender<StackRequest>) -> Self {
        RequestSender { tx }
    }

    pub async fn read(&self, characteristic: CharacteristicId) -> Result<Vec<u8>> {
        self.request(|responder| StackRequest::Read {
            characteristic,
            responder,
        })
        .await
    }

    pub async fn write(&self, characteristic: CharacteristicId, value: Vec<u8>) -> Result<()> {
        self.request(|responder| StackRequest::Write {
            characteristic,
            value,
            responder,
        })
        .await
    }

    pub async fn start_notify(&self, characteristic: CharacteristicId) -> Result<()> {
        self.request(|responder| StackRequest::StartNotify {
            characteristic,
            responder,
        })
        .await
    }

    pub async fn stop_notify(&self, characteristic: CharacteristicId) -> Result<()> {
        self.request(|responder| StackRequest::StopNotify {
            characteristic,
            responder,
        })
        .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> StackRequest,
    ) -> Result<T> {
        let (responder, response) = oneshot::channel();
        self.tx
            .send(build(responder))
            .await
            .map_err(|_| Error::EmulatorStopped)?;
        response.await.map_err(|_| Error::EmulatorStopped)?
    }
}
