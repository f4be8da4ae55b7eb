//! Two stacked layers, the top one with a glowing quad.
//!
//! Run with `RUST_LOG=debug` to watch stages being built and cached.

use strata::prelude::*;
use strata::prelude::glam::{Vec3, Vec4};

fn main() -> strata::render::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewportConfig {
        debug_timing: true,
        timing_period_ms: 0,
        ..ViewportConfig::default()
    };
    let mut viewport = Viewport::new("demo", Extent::new(64, 36), config)?;

    let backdrop = viewport.create_normal_layer(None, -1)?;
    let scene = backdrop.stack_mut().create_scene(Some("backdrop"));
    scene.write().background = Some(Vec4::new(0.05, 0.05, 0.1, 1.0));
    scene.write().add(Object3D::mesh(
        "floor",
        Quad::new(12.0, 2.0),
        Material::basic("floor", Vec4::new(0.3, 0.3, 0.3, 1.0)).shared(),
    ));

    let glow = viewport.create_bloomable_layer(None, -1)?;
    glow.add_listener(|event| {
        if let LayerEvent::AfterRender { mode, delta_time } = event {
            log::debug!("Glow layer drew in {} mode ({:.3}s)", mode, delta_time);
        }
    });
    let scene = glow.stack_mut().create_scene(Some("lamps"));
    {
        let mut scene = scene.write();
        scene.add(
            Object3D::mesh(
                "lamp",
                Quad::square(2.0),
                Material::basic("lamp", Vec4::new(1.0, 0.8, 0.3, 1.0)).shared(),
            )
            .with_position(Vec3::new(-2.0, 1.0, 0.0))
            .with_layers(LayerMask::DEFAULT | LayerMask::BLOOM),
        );
        scene.add(
            Object3D::mesh(
                "crate",
                Quad::square(2.0),
                Material::basic("crate", Vec4::new(0.4, 0.25, 0.1, 1.0)).shared(),
            )
            .with_position(Vec3::new(2.0, 1.0, 0.0)),
        );
    }
    glow.set_bloom_enabled(true);

    for frame in 0..4 {
        if frame == 2 {
            viewport.set_size(Extent::new(128, 72))?;
        }
        viewport.render(1.0 / 60.0);
    }

    for layer in viewport.layers() {
        let screen = layer.renderer().screen();
        let screen = screen.read();
        let (w, h) = (screen.width(), screen.height());
        log::info!(
            "{}: {}x{}, centre pixel {:?}",
            layer.name(),
            w,
            h,
            screen.pixel(w / 2, h / 2)
        );
    }

    let builder = viewport.builder().lock();
    let stats = builder.cache().stats();
    log::info!(
        "Stage cache: {} entries, {} hits, {} misses, hit rate {:.2}",
        builder.cache().len(),
        stats.hits,
        stats.misses,
        stats.hit_rate()
    );
    Ok(())
}
