//! Published spectrum state for visualization.
//!
//! The audio thread overwrites these arrays once per analysis frame; the
//! UI thread reads them at its own pace. Readers always receive copies,
//! so a display repaint can never observe a half-written frame and never
//! holds a reference into audio-thread state.

use parking_lot::Mutex;

#[derive(Debug)]
struct SnapshotData {
    unprocessed: Vec<f32>,
    processed: Vec<f32>,
    gain_reduction: Vec<f32>,
}

/// Triple-buffer of display spectra, one slot per bin up to Nyquist.
///
/// Magnitudes are stored linear (a full-scale bin-centered sine reads
/// 1.0); gain reduction in dB (positive means attenuation, negative means
/// boost). Stereo content is averaged per bin in linear units before
/// publication.
#[derive(Debug)]
pub struct SpectrumSnapshots {
    data: Mutex<SnapshotData>,
    num_bins: usize,
}

impl SpectrumSnapshots {
    /// Allocate snapshots for `num_bins` bins, initialized to silence.
    pub fn new(num_bins: usize) -> Self {
        Self {
            data: Mutex::new(SnapshotData {
                unprocessed: vec![0.0; num_bins],
                processed: vec![0.0; num_bins],
                gain_reduction: vec![0.0; num_bins],
            }),
            num_bins,
        }
    }

    /// Number of bins per snapshot.
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Publish the pre-processing linear magnitude spectrum.
    pub fn write_unprocessed(&self, db: &[f32]) {
        let mut data = self.data.lock();
        let n = data.unprocessed.len().min(db.len());
        data.unprocessed[..n].copy_from_slice(&db[..n]);
    }

    /// Publish the post-processing linear magnitude spectrum.
    pub fn write_processed(&self, db: &[f32]) {
        let mut data = self.data.lock();
        let n = data.processed.len().min(db.len());
        data.processed[..n].copy_from_slice(&db[..n]);
    }

    /// Publish the per-bin gain change in dB.
    pub fn write_gain_reduction(&self, db: &[f32]) {
        let mut data = self.data.lock();
        let n = data.gain_reduction.len().min(db.len());
        data.gain_reduction[..n].copy_from_slice(&db[..n]);
    }

    /// Copy the pre-processing spectrum into `dest` (shorter side wins).
    pub fn read_unprocessed_into(&self, dest: &mut [f32]) {
        let data = self.data.lock();
        let n = data.unprocessed.len().min(dest.len());
        dest[..n].copy_from_slice(&data.unprocessed[..n]);
    }

    /// Copy the post-processing spectrum into `dest`.
    pub fn read_processed_into(&self, dest: &mut [f32]) {
        let data = self.data.lock();
        let n = data.processed.len().min(dest.len());
        dest[..n].copy_from_slice(&data.processed[..n]);
    }

    /// Copy the gain-reduction array into `dest`.
    pub fn read_gain_reduction_into(&self, dest: &mut [f32]) {
        let data = self.data.lock();
        let n = data.gain_reduction.len().min(dest.len());
        dest[..n].copy_from_slice(&data.gain_reduction[..n]);
    }

    /// Allocating copy of the pre-processing spectrum, for tests and
    /// one-off reads.
    pub fn unprocessed(&self) -> Vec<f32> {
        self.data.lock().unprocessed.clone()
    }

    /// Allocating copy of the post-processing spectrum.
    pub fn processed(&self) -> Vec<f32> {
        self.data.lock().processed.clone()
    }

    /// Allocating copy of the gain-reduction array.
    pub fn gain_reduction(&self) -> Vec<f32> {
        self.data.lock().gain_reduction.clone()
    }
}
