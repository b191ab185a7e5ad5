//! mSBC decoder loop
//!
//! Reads SCO packets from the link, decodes every complete eSCO frame
//! and writes the resulting PCM to the local endpoint.

use super::{CancelToken, CleanupGuard, ExitReason};
use crate::audio::pcm::PcmSink;
use crate::codec::{MsbcSession, SbcCodec};
use crate::error::is_interrupted;
use crate::network::sco::LinkReader;
use crate::transport::Endpoint;

/// Run the decoder until the link closes or `cancel` is raised
///
/// Never returns early without finalizing the codec session and running
/// the endpoint's cleanup hook.
pub fn run_decoder<E, C, L, K>(
    endpoint: &E,
    codec: C,
    link: &mut L,
    sink: &mut K,
    cancel: &CancelToken,
) -> ExitReason
where
    E: Endpoint + ?Sized,
    C: SbcCodec,
    L: LinkReader + ?Sized,
    K: PcmSink + ?Sized,
{
    let _cleanup = CleanupGuard::new(endpoint, "sco-msbc-dec");
    endpoint.set_running();

    let mut session = match MsbcSession::new(codec, endpoint.mtu_write()) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Couldn't initialize mSBC codec: {}", e);
            return ExitReason::InitFailed;
        }
    };

    // leading PCM samples that already went through volume scaling
    let mut scaled = 0;

    tracing::debug!("sco-msbc-dec: START");
    loop {
        if cancel.is_cancelled() {
            break ExitReason::Cancelled;
        }

        if session.data().len_in() == 0 {
            tracing::warn!(
                "mSBC data buffer overrun, dropping {} bytes",
                session.data().len_out()
            );
            session.data_mut().rewind();
        }

        let len = match link.read(session.data_mut().tail_mut()) {
            Ok(0) => {
                tracing::debug!("SCO link closed");
                break ExitReason::LinkClosed;
            }
            Ok(len) => len,
            Err(e) if is_interrupted(&e) => continue,
            Err(e) => {
                tracing::error!("SCO poll and read error: {}", e);
                0
            }
        };

        if !endpoint.is_active() {
            // nobody is listening, do not build up a backlog
            session.data_mut().rewind();
            session.pcm_mut().rewind();
            scaled = 0;
            continue;
        }

        session.data_mut().seek(len);

        // Decode every complete frame, so that MTUs larger than the frame
        // size do not fill up the data buffer.
        let drained = loop {
            match session.decode_step() {
                Ok(0) => break true,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("mSBC decoding error: {}", e);
                    break false;
                }
            }
        };
        if !drained {
            continue;
        }

        let staged = session.pcm().len_out();
        if staged == 0 {
            continue;
        }

        endpoint.scale(&mut session.pcm_mut().data_mut()[scaled..]);

        let written = match sink.write(session.pcm().data()) {
            Ok(0) => {
                endpoint.stop_if_no_clients();
                staged
            }
            Ok(written) => written.min(staged),
            Err(e) => {
                tracing::error!("PCM write error: {}", e);
                staged
            }
        };

        session.pcm_mut().shift(written);
        scaled = staged - written;
    }
}
