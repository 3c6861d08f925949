// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use crypto::Signature;
use encoding::{from_slice, to_vec, Decodable, Encodable};
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use std::io::{Read, Write};
use types::{ContractId, Currency, WithdrawalMessage};

/// Payment method discriminators on the wire.
pub const PAY_BY_EPHEMERAL_ACCOUNT: u8 = 1;
pub const PAY_BY_CONTRACT: u8 = 2;

/// Upper bound on a single framed message. Program parameter data is
/// streamed separately and is not subject to this limit.
const MAX_MESSAGE_LEN: u64 = encoding::MAX_ALLOC;

const RESPONSE_OK: u8 = 0;
const RESPONSE_ERR: u8 = 1;

/// Reads one length-prefixed message from the stream.
pub async fn read_message<T, S>(stream: &mut S) -> Result<T, Error>
where
    T: Decodable,
    S: AsyncRead + Unpin,
{
    let body = read_raw_frame(stream).await?;
    Ok(from_slice(&body)?)
}

/// Writes one length-prefixed message to the stream.
pub async fn write_message<T, S>(stream: &mut S, msg: &T) -> Result<(), Error>
where
    T: Encodable,
    S: AsyncWrite + Unpin,
{
    let body = to_vec(msg)?;
    write_raw_frame(stream, &body).await
}

/// Writes a successful response frame.
pub async fn write_response<T, S>(stream: &mut S, msg: &T) -> Result<(), Error>
where
    T: Encodable,
    S: AsyncWrite + Unpin,
{
    let mut body = vec![RESPONSE_OK];
    msg.encode(&mut body)?;
    write_raw_frame(stream, &body).await
}

/// Writes an error response frame carrying the error's display text.
pub async fn write_error<S>(stream: &mut S, err: &Error) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    let mut body = vec![RESPONSE_ERR];
    err.to_string().encode(&mut body)?;
    write_raw_frame(stream, &body).await
}

/// Reads a response frame, turning a peer-reported error into
/// `Error::Remote`.
pub async fn read_response<T, S>(stream: &mut S) -> Result<T, Error>
where
    T: Decodable,
    S: AsyncRead + Unpin,
{
    let body = read_raw_frame(stream).await?;
    let mut r = body.as_slice();
    match u8::decode(&mut r)? {
        RESPONSE_OK => Ok(from_slice(r)?),
        RESPONSE_ERR => Err(Error::Remote(String::decode(&mut r)?)),
        other => Err(Error::MalformedMessage(encoding::Error::InvalidValue(
            format!("invalid response tag {}", other),
        ))),
    }
}

async fn read_raw_frame<S>(stream: &mut S) -> Result<Vec<u8>, Error>
where
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 8];
    stream.read_exact(&mut len_buf).await.map_err(map_io)?;
    let len = u64::from_le_bytes(len_buf);
    if len > MAX_MESSAGE_LEN {
        return Err(Error::MalformedMessage(encoding::Error::AllocLimit(len)));
    }
    let mut body = vec![0u8; len as usize];
    stream.read_exact(&mut body).await.map_err(map_io)?;
    Ok(body)
}

async fn write_raw_frame<S>(stream: &mut S, body: &[u8]) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    let len = (body.len() as u64).to_le_bytes();
    stream.write_all(&len).await.map_err(map_io)?;
    stream.write_all(body).await.map_err(map_io)?;
    stream.flush().await.map_err(map_io)?;
    Ok(())
}

fn map_io(e: std::io::Error) -> Error {
    Error::MalformedMessage(encoding::Error::Io(e))
}

/// Leading frame of every payment exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRequest {
    pub kind: u8,
}

impl Encodable for PaymentRequest {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.kind.encode(w)
    }
}

impl Decodable for PaymentRequest {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(PaymentRequest {
            kind: u8::decode(r)?,
        })
    }
}

/// Body of an ephemeral-account payment: the signed withdrawal message
/// plus a scheduling priority.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PayByEphemeralAccountRequest {
    pub message: WithdrawalMessage,
    pub priority: i64,
    pub signature: Signature,
}

impl Encodable for PayByEphemeralAccountRequest {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.message.encode(w)?;
        self.priority.encode(w)?;
        self.signature.encode(w)
    }
}

impl Decodable for PayByEphemeralAccountRequest {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(PayByEphemeralAccountRequest {
            message: WithdrawalMessage::decode(r)?,
            priority: i64::decode(r)?,
            signature: Signature::decode(r)?,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PayByEphemeralAccountResponse {
    pub amount: Currency,
}

impl Encodable for PayByEphemeralAccountResponse {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.amount.encode(w)
    }
}

impl Decodable for PayByEphemeralAccountResponse {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(PayByEphemeralAccountResponse {
            amount: Currency::decode(r)?,
        })
    }
}

/// Body of a contract payment: the revision delta the renter proposes,
/// already signed on its side.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PayByContractRequest {
    pub contract_id: ContractId,
    pub new_revision_number: u64,
    pub new_valid_values: Vec<Currency>,
    pub new_missed_values: Vec<Currency>,
    pub signature: Signature,
}

impl Encodable for PayByContractRequest {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.contract_id.encode(w)?;
        self.new_revision_number.encode(w)?;
        self.new_valid_values.encode(w)?;
        self.new_missed_values.encode(w)?;
        self.signature.encode(w)
    }
}

impl Decodable for PayByContractRequest {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(PayByContractRequest {
            contract_id: ContractId::decode(r)?,
            new_revision_number: u64::decode(r)?,
            new_valid_values: Vec::decode(r)?,
            new_missed_values: Vec::decode(r)?,
            signature: Signature::decode(r)?,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PayByContractResponse {
    pub host_signature: Signature,
}

impl Encodable for PayByContractResponse {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.host_signature.encode(w)
    }
}

impl Decodable for PayByContractResponse {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(PayByContractResponse {
            host_signature: Signature::decode(r)?,
        })
    }
}

/// The frame that opens a program exchange after payment is accepted.
/// A default contract id means the program runs against no contract and
/// must stay read-only. Mutating programs attach the renter-signed
/// commit revision up front: execution is deterministic, so the renter
/// can sign the post-program contract state before the host runs a
/// single instruction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecuteProgramRequest {
    pub contract_id: ContractId,
    pub header: vm::ProgramHeader,
    pub commit_revision: Option<PayByContractRequest>,
}

impl Encodable for ExecuteProgramRequest {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.contract_id.encode(w)?;
        self.header.encode(w)?;
        self.commit_revision.encode(w)
    }
}

impl Decodable for ExecuteProgramRequest {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        Ok(ExecuteProgramRequest {
            contract_id: ContractId::decode(r)?,
            header: vm::ProgramHeader::decode(r)?,
            commit_revision: Option::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::pipe;
    use async_std::task;

    #[test]
    fn response_round_trip() {
        task::block_on(async {
            let (mut a, mut b) = pipe();
            write_response(&mut a, &PayByEphemeralAccountResponse {
                amount: Currency::from(1000u64),
            })
            .await
            .unwrap();
            let resp: PayByEphemeralAccountResponse = read_response(&mut b).await.unwrap();
            assert_eq!(resp.amount, Currency::from(1000u64));
        })
    }

    #[test]
    fn error_response_surfaces_as_remote() {
        task::block_on(async {
            let (mut a, mut b) = pipe();
            write_error(&mut a, &Error::UnknownPaymentMethod(9))
                .await
                .unwrap();
            let err = read_response::<PayByContractResponse, _>(&mut b)
                .await
                .err()
                .unwrap();
            assert!(matches!(err, Error::Remote(msg) if msg.contains("9")));
        })
    }
}
