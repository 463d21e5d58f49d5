//! Fixed audio format contract: PCM16LE, mono, 16 kHz. Every
//! other component in the pipeline consumes raw PCM in this format; only
//! the subprocess STT engine needs a WAV-wrapped copy on disk.

pub const SAMPLE_RATE_HZ: u32 = 16_000;
pub const BITS_PER_SAMPLE: u16 = 16;
pub const CHANNELS: u16 = 1;
pub const BLOCK_ALIGN: u16 = (BITS_PER_SAMPLE / 8) * CHANNELS;
pub const BYTE_RATE: u32 = SAMPLE_RATE_HZ * BLOCK_ALIGN as u32;

/// Size in bytes of a canonical PCM WAV header (RIFF/WAVE/fmt /data, no
/// extension chunks).
pub const WAV_HEADER_LEN: usize = 44;

pub fn duration_ms_for_bytes(len: usize) -> u64 {
    (len as u64 * 1000) / BYTE_RATE as u64
}

pub fn bytes_for_duration_ms(ms: u64) -> usize {
    ((ms * BYTE_RATE as u64) / 1000) as usize
}

/// Wraps `pcm` in a canonical 44-byte PCM16LE mono 16 kHz WAV header.
/// `chunkSize = 36 + dataSize`.
pub fn wrap_wav(pcm: &[u8]) -> Vec<u8> {
    let data_len = pcm.len() as u32;
    let chunk_size = 36 + data_len;
    let byte_rate = BYTE_RATE;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&chunk_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size (PCM)
    out.extend_from_slice(&1u16.to_le_bytes()); // audio format: PCM
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&SAMPLE_RATE_HZ.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);
    out
}

/// Strips the 44-byte canonical header, returning the raw PCM payload.
/// Used only by tests to assert the wrap/strip round-trip.
pub fn strip_wav_header(wav: &[u8]) -> Option<&[u8]> {
    wav.get(WAV_HEADER_LEN..)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_then_strip_round_trips() {
        let pcm: Vec<u8> = (0u8..=255).cycle().take(4000).collect();
        let wav = wrap_wav(&pcm);
        assert_eq!(wav.len(), WAV_HEADER_LEN + pcm.len());
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(strip_wav_header(&wav).unwrap(), pcm.as_slice());
    }

    #[test]
    fn chunk_size_is_36_plus_data_len() {
        let pcm = vec![0u8; 100];
        let wav = wrap_wav(&pcm);
        let chunk_size = u32::from_le_bytes(wav[4..8].try_into().unwrap());
        assert_eq!(chunk_size, 136);
    }

    #[test]
    fn duration_and_byte_conversions_agree() {
        let ms = 250;
        let bytes = bytes_for_duration_ms(ms);
        assert_eq!(duration_ms_for_bytes(bytes), ms);
    }
}
