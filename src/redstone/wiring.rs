//! Neighbor re-evaluation after a circuit is cut or an update is denied

use crate::core::types::{BlockKind, BlockPos, Direction};
use crate::world::WorldHost;

/// Whether a wire at `pos` still has a manual source next to it
fn has_manual_source<H: WorldHost + ?Sized>(host: &H, world: &str, pos: BlockPos) -> bool {
    Direction::ALL.iter().any(|&face| {
        host.block_at(world, pos.relative(face))
            .map(|kind| kind.powers_wire())
            .unwrap_or(false)
    })
}

/// Refresh the six blocks around `pos`
///
/// Wires left without a lever or button beside them are re-placed so they
/// drop to zero power. Failures on individual neighbors are logged and
/// skipped. Returns how many neighbors were refreshed.
pub fn refresh_neighbors<H: WorldHost + ?Sized>(
    host: &H,
    world: &str,
    pos: BlockPos,
    apply_physics: bool,
) -> usize {
    let mut refreshed = 0;
    for face in Direction::ALL {
        let adjacent = pos.relative(face);
        if let Err(e) = host.refresh_block(world, adjacent, apply_physics) {
            tracing::debug!("Skipping refresh of {} in {}: {}", adjacent, world, e);
            continue;
        }
        refreshed += 1;

        let is_wire = matches!(host.block_at(world, adjacent), Ok(BlockKind::RedstoneWire));
        if is_wire && !has_manual_source(host, world, adjacent) {
            if let Err(e) = host.set_block(world, adjacent, BlockKind::RedstoneWire) {
                tracing::debug!("Could not reset wire at {} in {}: {}", adjacent, world, e);
            } else {
                tracing::debug!("Reset unpowered wire at {} in {}", adjacent, world);
            }
        }
    }
    refreshed
}
