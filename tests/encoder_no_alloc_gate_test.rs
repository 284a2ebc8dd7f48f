use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tui_video::core::BlockGrid;
use tui_video::engine::FrameDiffEncoder;
use tui_video::types::{GridGeometry, Rgb};

struct CountingAlloc;

static COUNT_ENABLED: AtomicBool = AtomicBool::new(false);
static ALLOC_COUNT: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if COUNT_ENABLED.load(Ordering::Relaxed) {
            ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if COUNT_ENABLED.load(Ordering::Relaxed) {
            ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        System.realloc(ptr, layout, new_size)
    }
}

fn with_alloc_counting<F: FnOnce()>(f: F) -> usize {
    ALLOC_COUNT.store(0, Ordering::Relaxed);
    COUNT_ENABLED.store(true, Ordering::Relaxed);
    f();
    COUNT_ENABLED.store(false, Ordering::Relaxed);
    ALLOC_COUNT.load(Ordering::Relaxed)
}

fn frame(rows: usize, cols: usize, phase: u8) -> BlockGrid {
    let mut grid = BlockGrid::new(rows, cols);
    for row in 0..rows {
        for col in 0..cols {
            let v = (row * 31 + col * 17) as u8;
            let upper = Rgb::new(v.wrapping_add(phase), v, 255 - v);
            let lower = Rgb::new(v, v.wrapping_mul(3).wrapping_add(phase), v / 2);
            grid.set_block(row, col, upper, lower);
        }
    }
    grid
}

#[test]
fn diff_and_emit_are_allocation_free_after_warmup() {
    let geometry = GridGeometry::new(57, 32).unwrap();
    let (rows, cols) = (geometry.block_rows(), geometry.cols());
    let mut enc = FrameDiffEncoder::new(geometry, 150).unwrap();

    let frames: Vec<BlockGrid> = (0..8u8).map(|p| frame(rows, cols, p * 40)).collect();

    // Warm-up: commit a state and grow the output buffer past any repaint.
    for _ in 0..3 {
        for grid in &frames {
            enc.encode_grid(grid).unwrap();
        }
    }

    let mut total = 0usize;
    let allocs = with_alloc_counting(|| {
        for _ in 0..25 {
            for grid in &frames {
                total += enc.encode_grid(grid).map(|out| out.bytes.len()).unwrap_or(0);
            }
        }
    });

    assert!(total > 0);
    assert_eq!(allocs, 0);
}
