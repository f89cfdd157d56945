use crate::error::WavError;

/// Largest sample width accepted by [`WavFormatBuilder::build`].
pub const MAX_BITS_PER_SAMPLE: u16 = 32;

/// Linear PCM format parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavFormat {
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
}

impl Default for WavFormat {
    /// 44.1 kHz, mono, 16-bit.
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

impl WavFormat {
    /// Start a [`WavFormatBuilder`] seeded with the default format.
    pub fn builder() -> WavFormatBuilder {
        WavFormatBuilder::default()
    }

    /// Wrap parameters read from an existing header without validating them.
    pub(crate) fn from_header(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Bytes per frame (one sample for every channel), the block align field.
    ///
    /// Saturates at `u16::MAX` for parsed headers whose frames do not fit.
    pub fn frame_size(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample / 8)
    }

    /// Bytes of PCM per second of audio, saturating at `u32::MAX`.
    pub fn byte_rate(&self) -> u32 {
        let rate = u64::from(self.bits_per_sample) * u64::from(self.sample_rate) * u64::from(self.channels) / 8;
        u32::try_from(rate).unwrap_or(u32::MAX)
    }
}

/// Builder for a validated [`WavFormat`].
#[derive(Clone, Debug, Default)]
pub struct WavFormatBuilder {
    format: WavFormat,
}

impl WavFormatBuilder {
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.format.sample_rate = sample_rate;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.format.channels = channels;
        self
    }

    pub fn bits_per_sample(mut self, bits_per_sample: u16) -> Self {
        self.format.bits_per_sample = bits_per_sample;
        self
    }

    /// Validate the parameters and produce the format.
    pub fn build(self) -> Result<WavFormat, WavError> {
        let format = self.format;

        if format.sample_rate == 0 {
            return Err(WavError::unsupported("sample rate must be greater than zero"));
        }
        if format.channels == 0 {
            return Err(WavError::unsupported("channel count must be greater than zero"));
        }
        if format.bits_per_sample == 0
            || format.bits_per_sample % 8 != 0
            || format.bits_per_sample > MAX_BITS_PER_SAMPLE
        {
            return Err(WavError::unsupported(format!(
                "bits per sample must be a multiple of 8 between 8 and {MAX_BITS_PER_SAMPLE}, got {}",
                format.bits_per_sample
            )));
        }

        let block_align = u32::from(format.channels) * u32::from(format.bits_per_sample / 8);
        if block_align > u32::from(u16::MAX) {
            return Err(WavError::unsupported(format!(
                "{} channel(s) of {}-bit audio exceed the block align field",
                format.channels, format.bits_per_sample
            )));
        }

        let byte_rate = u64::from(format.sample_rate) * u64::from(block_align);
        if byte_rate > u64::from(u32::MAX) {
            return Err(WavError::unsupported(format!(
                "byte rate {byte_rate} does not fit the header"
            )));
        }

        Ok(format)
    }
}
