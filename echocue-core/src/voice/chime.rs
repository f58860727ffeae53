//! Collectible chimes: a short arpeggio of bell notes whose intervals
//! identify the kind of item.

use super::oscillator::{attack_release, ms_to_samples, sine};
use super::{CollectibleKind, Oscillators, PulseContext, PulseShape};

const NOTE_MS: f32 = 80.0;
/// Inharmonic partial that gives the note its bell colour.
const BELL_PARTIAL: f32 = 2.76;

fn ratios(kind: CollectibleKind) -> &'static [f32] {
    match kind {
        CollectibleKind::Resource => &[1.0, 1.5],
        CollectibleKind::Health => &[1.0, 1.25, 1.5],
        CollectibleKind::Artifact => &[1.0, 1.335, 1.782, 2.0],
    }
}

pub(super) fn pulse_shape(kind: CollectibleKind, sample_rate: f32) -> PulseShape {
    let notes = ratios(kind).len() as f32;
    PulseShape::from_ms(NOTE_MS * notes, 40.0, sample_rate)
}

pub(super) fn sample(kind: CollectibleKind, osc: &mut Oscillators, ctx: &PulseContext) -> f32 {
    let sr = ctx.sample_rate;
    let notes = ratios(kind);
    let note_len = ms_to_samples(NOTE_MS, sr);
    let index = ((ctx.pos / note_len) as usize).min(notes.len() - 1);
    let pos = ctx.pos - index as u32 * note_len;
    if pos == 0 {
        osc.primary.reset();
        osc.secondary.reset();
    }

    let frequency = ctx.frequency * notes[index];
    let t = pos as f32 / sr;
    let env = attack_release(pos, note_len, ms_to_samples(1.0, sr), ms_to_samples(8.0, sr))
        * (-t * 14.0).exp();
    let a = osc.primary.value();
    let b = osc.secondary.value();
    osc.primary.advance(frequency, sr);
    osc.secondary.advance(frequency * BELL_PARTIAL, sr);
    env * (sine(a) + 0.25 * sine(b)) / 1.25
}
