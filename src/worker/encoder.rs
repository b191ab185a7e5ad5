//! mSBC encoder loop
//!
//! Reads PCM from the local endpoint, encodes it block by block and
//! writes the eSCO frames to the link in MTU-sized packets. Writes are
//! paced so the link carries exactly the nominal audio rate.

use super::{CancelToken, CleanupGuard, ExitReason};
use crate::audio::pacing::PacingClock;
use crate::audio::pcm::PcmSource;
use crate::codec::{MsbcSession, SbcCodec, MSBC_CODESAMPLES, MSBC_SAMPLE_RATE};
use crate::error::PcmError;
use crate::network::sco::LinkWriter;
use crate::transport::Endpoint;

/// Run the encoder until the link fails or `cancel` is raised
///
/// Never returns early without finalizing the codec session and running
/// the endpoint's cleanup hook.
pub fn run_encoder<E, C, S, L>(
    endpoint: &E,
    codec: C,
    source: &mut S,
    link: &mut L,
    cancel: &CancelToken,
) -> ExitReason
where
    E: Endpoint + ?Sized,
    C: SbcCodec,
    S: PcmSource + ?Sized,
    L: LinkWriter + ?Sized,
{
    let _cleanup = CleanupGuard::new(endpoint, "sco-msbc-enc");
    endpoint.set_running();

    // the data buffer is sized for this MTU, later updates do not apply
    let mtu = endpoint.mtu_write();
    if mtu == 0 {
        tracing::error!("Invalid SCO write MTU: 0");
        return ExitReason::LinkError;
    }

    let mut session = match MsbcSession::new(codec, mtu) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Couldn't initialize mSBC codec: {}", e);
            return ExitReason::InitFailed;
        }
    };

    let mut clock = PacingClock::new(MSBC_SAMPLE_RATE);

    tracing::debug!("sco-msbc-enc: START");
    'poll: loop {
        if cancel.is_cancelled() {
            break ExitReason::Cancelled;
        }

        let samples = match source.read(session.pcm_mut().tail_mut()) {
            Ok(0) => {
                endpoint.stop_if_no_clients();
                clock.reset();
                continue;
            }
            Ok(samples) => samples,
            Err(PcmError::Stale) => {
                tracing::debug!("PCM stream is stale, reinitializing mSBC encoder");
                if let Err(e) = session.init() {
                    tracing::error!("Couldn't reinitialize mSBC codec: {}", e);
                    break ExitReason::InitFailed;
                }
                clock.reset();
                continue;
            }
            Err(e) if e.is_interrupted() => continue,
            Err(e) => {
                tracing::error!("PCM poll and read error: {}", e);
                endpoint.stop_if_no_clients();
                clock.reset();
                continue;
            }
        };

        session.pcm_mut().seek(samples);

        while session.pcm().len_out() >= MSBC_CODESAMPLES {
            match session.encode_step() {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("mSBC encoding error: {}", e);
                    break;
                }
            }

            if let Err(reason) = flush(endpoint, mtu, &mut session, link, &mut clock) {
                break 'poll reason;
            }
        }
    }
}

/// Write every complete `mtu`-sized packet, then pace and publish the delay
///
/// Bytes that do not fill a whole packet stay at the front of the data
/// buffer for the next cycle.
fn flush<E, C, L>(
    endpoint: &E,
    mtu: usize,
    session: &mut MsbcSession<C>,
    link: &mut L,
    clock: &mut PacingClock,
) -> Result<(), ExitReason>
where
    E: Endpoint + ?Sized,
    C: SbcCodec,
    L: LinkWriter + ?Sized,
{
    let data = session.data().data();
    let mut written = 0;
    while data.len() - written >= mtu {
        match link.write(&data[written..written + mtu]) {
            Ok(0) => {
                tracing::debug!("SCO link closed");
                return Err(ExitReason::LinkClosed);
            }
            Ok(len) => written += len,
            Err(e) => {
                tracing::error!("SCO write error: {}", e);
                return Err(ExitReason::LinkError);
            }
        }
    }

    // keep data transfer at a constant bit rate
    clock.sync((session.frames() * MSBC_CODESAMPLES) as u64);
    let delay = clock.busy_usec() / 100;
    endpoint.set_delay(u32::try_from(delay).unwrap_or(u32::MAX));

    session.reset_frames();
    session.data_mut().shift(written);
    Ok(())
}
