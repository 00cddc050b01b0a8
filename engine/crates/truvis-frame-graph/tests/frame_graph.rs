use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ash::vk;
use ash::vk::Handle;
use parking_lot::Mutex;
use truvis_frame_graph::context::RgFrameGraphContext;
use truvis_frame_graph::error::RgError;
use truvis_frame_graph::graph::render_graph::RenderGraph;
use truvis_frame_graph::pass::pass_id::RgPassId;
use truvis_frame_graph::resource::handle::RgResourceHandle;
use truvis_gfx::commands::recording_command_buffer::{GfxRecordedCommand, GfxRecordingCommandBuffer};
use truvis_gfx::resources::buffer::GfxBuffer;
use truvis_gfx::resources::resource::GfxResource;
use truvis_gfx::resources::resource_state::GfxResourceState;

struct WriterPass;
struct ReaderPass;
struct IntruderPass;

fn add_buffer(ctx: &RgFrameGraphContext, raw: u64, name: &str) -> RgResourceHandle {
    let buffer = GfxBuffer::new(vk::Buffer::from_raw(raw), 256, vk::BufferUsageFlags::STORAGE_BUFFER);
    ctx.adder().add_resource(GfxResource::from_buffer(name, buffer, GfxResourceState::UNDEFINED))
}

#[test]
fn test_end_to_end_write_access() {
    let ctx = RgFrameGraphContext::default();
    let handle = add_buffer(&ctx, 1, "target");
    assert!(ctx.resource_manager().contains(handle));

    let mut graph = RenderGraph::new();
    let fetched = Arc::new(AtomicBool::new(false));

    let resource_manager = ctx.resource_manager().clone();
    let fetched_in_pass = fetched.clone();
    assert!(graph.add_pass(
        RgPassId::of::<WriterPass>(),
        move |builder| {
            builder.write(handle);
            true
        },
        move |pass, pass_ctx| {
            resource_manager.with_lock(|resources| {
                let resource = resources.get_write_resource(handle, pass.write_token());
                assert_eq!(resource.name(), "target");
                resources.transition_to(handle, pass.write_token(), pass_ctx.cmd(), GfxResourceState::BUFFER_TRANSFER_DST);
            });
            pass_ctx.cmd().cmd_update_buffer(vk::Buffer::from_raw(1), 0, &[0u8; 16]);
            fetched_in_pass.store(true, Ordering::SeqCst);
            true
        },
    ));

    let mut cmd = GfxRecordingCommandBuffer::new("frame");
    graph.run_frame(&mut cmd, 0).unwrap();

    assert!(fetched.load(Ordering::SeqCst));
    assert_eq!(cmd.barrier_count(), 1);
    assert!(cmd.commands().iter().any(|c| matches!(c, GfxRecordedCommand::UpdateBuffer { .. })));

    // 第二帧资源已经处于目标状态，不再录制 barrier
    cmd.clear();
    graph.run_frame(&mut cmd, 1).unwrap();
    assert_eq!(cmd.barrier_count(), 0);

    // 擦除后 contains 为 false
    assert!(ctx.eraser().erase_resource(handle).is_some());
    assert!(!ctx.resource_manager().contains(handle));
}

/// 被拒绝的访问：(pass, handle, 是否写访问)
type DeniedLog = Arc<Mutex<Vec<(&'static str, RgResourceHandle, bool)>>>;

/// 注册一个声明读写 `own` 的 pass，execute 中尝试访问 `own` 与 `other`，记录被拒绝的访问
fn add_isolated_pass<T: 'static>(
    graph: &mut RenderGraph,
    ctx: &RgFrameGraphContext,
    name: &'static str,
    own: RgResourceHandle,
    other: RgResourceHandle,
    denied: DeniedLog,
) {
    let resource_manager = ctx.resource_manager().clone();
    graph.add_pass(
        RgPassId::of::<T>(),
        move |builder| {
            builder.read_write(own);
            true
        },
        move |pass, _| {
            resource_manager.with_lock(|resources| {
                assert!(resources.try_get_read_resource(own, pass.read_token()).is_ok());
                assert!(resources.try_get_write_resource(own, pass.write_token()).is_ok());

                let mut denied = denied.lock();
                if let Err(RgError::AccessDenied { handle, .. }) = resources.try_get_read_resource(other, pass.read_token()) {
                    denied.push((name, handle, false));
                }
                if let Err(RgError::AccessDenied { handle, .. }) = resources.try_get_write_resource(other, pass.write_token())
                {
                    denied.push((name, handle, true));
                }
            });
            true
        },
    );
}

#[test]
fn test_token_isolation_between_passes() {
    let ctx = RgFrameGraphContext::default();
    let mine = add_buffer(&ctx, 1, "mine");
    let theirs = add_buffer(&ctx, 2, "theirs");

    let denied = DeniedLog::default();
    let mut graph = RenderGraph::new();
    add_isolated_pass::<WriterPass>(&mut graph, &ctx, "writer", theirs, mine, denied.clone());
    add_isolated_pass::<IntruderPass>(&mut graph, &ctx, "intruder", mine, theirs, denied.clone());

    let mut cmd = GfxRecordingCommandBuffer::new("frame");
    graph.run_frame(&mut cmd, 0).unwrap();
    assert_eq!(
        *denied.lock(),
        vec![
            ("writer", mine, false),
            ("writer", mine, true),
            ("intruder", theirs, false),
            ("intruder", theirs, true),
        ]
    );
}

#[test]
#[should_panic(expected = "was not declared")]
fn test_undeclared_access_panics_inside_execute() {
    let ctx = RgFrameGraphContext::default();
    let declared = add_buffer(&ctx, 1, "declared");
    let undeclared = add_buffer(&ctx, 2, "undeclared");

    let mut graph = RenderGraph::new();
    let resource_manager = ctx.resource_manager().clone();
    graph.add_pass(
        RgPassId::of::<ReaderPass>(),
        move |builder| {
            builder.read(declared);
            true
        },
        move |pass, _| {
            resource_manager.with_lock(|resources| {
                resources.get_read_resource(undeclared, pass.read_token());
            });
            true
        },
    );

    let mut cmd = GfxRecordingCommandBuffer::new("frame");
    let _ = graph.run_frame(&mut cmd, 0);
}

#[test]
fn test_tokens_reset_every_frame() {
    let ctx = RgFrameGraphContext::default();
    let a = add_buffer(&ctx, 1, "a");
    let b = add_buffer(&ctx, 2, "b");

    // 第一帧声明 a，第二帧声明 b
    let frame = Arc::new(Mutex::new(0u32));
    let frame_in_setup = frame.clone();
    let mut graph = RenderGraph::new();
    graph.add_pass(
        RgPassId::of::<ReaderPass>(),
        move |builder| {
            builder.read(if *frame_in_setup.lock() == 0 { a } else { b });
            true
        },
        |_, _| true,
    );

    let mut cmd = GfxRecordingCommandBuffer::new("frame");
    graph.run_frame(&mut cmd, 0).unwrap();
    let access = graph.pass_access(RgPassId::of::<ReaderPass>()).unwrap();
    assert!(access.read_token().has_access(a));

    *frame.lock() = 1;
    graph.run_frame(&mut cmd, 1).unwrap();
    let access = graph.pass_access(RgPassId::of::<ReaderPass>()).unwrap();
    assert!(!access.read_token().has_access(a));
    assert!(access.read_token().has_access(b));
    assert!(access.write_token().is_empty());
}

#[test]
fn test_validation_reports_reader_registered_first() {
    let ctx = RgFrameGraphContext::default();
    let shared = add_buffer(&ctx, 1, "shared");

    let mut graph = RenderGraph::new();
    graph.add_pass(
        RgPassId::of::<ReaderPass>(),
        move |builder| {
            builder.read(shared);
            true
        },
        |_, _| true,
    );
    graph.add_pass(
        RgPassId::of::<WriterPass>(),
        move |builder| {
            builder.write(shared);
            true
        },
        |_, _| true,
    );

    graph.setup().unwrap();
    let report = graph.validate();
    assert_eq!(report.issues().len(), 1);
    assert_eq!(
        report.dependency_order(),
        Some(vec![RgPassId::of::<WriterPass>(), RgPassId::of::<ReaderPass>()])
    );
    // 校验不改变执行顺序
    assert_eq!(
        graph.pass_ids().collect::<Vec<_>>(),
        vec![RgPassId::of::<ReaderPass>(), RgPassId::of::<WriterPass>()]
    );
}

#[test]
fn test_gfx_error_converts() {
    let ctx = RgFrameGraphContext::new(truvis_frame_graph::heap::heap_manager::RgHeapCapacities {
        srv: 1,
        rtv: 1,
        dsv: 1,
    });
    let result: Result<(), RgError> = ctx.heap_manager().with_unique_lock(|heaps| {
        heaps.dsv_heap_allocator().allocate()?;
        heaps.dsv_heap_allocator().allocate()?;
        Ok(())
    });
    assert!(matches!(result, Err(RgError::Gfx(_))));
}
