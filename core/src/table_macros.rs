//! Declarative macros for declaring dispatch tables once per type.

/// Build a table on first use and cache it for the life of the process.
///
/// Expands to a `Result<&'static $table, DispatchError>`. The build
/// expression runs at most once; a build error is cached and cloned on every
/// later access, so a defective declaration fails the same way each time.
///
/// The table type must name the concrete target (`HandlerTable<Order>`, not
/// `HandlerTable<Self>`), because statics cannot refer to `Self`.
///
/// # Example
///
/// ```rust,ignore
/// use composable_aggregate_core::static_table;
///
/// impl EventSourced for Order {
///     fn handlers() -> Result<&'static HandlerTable<Self>, DispatchError> {
///         static_table!(HandlerTable<Order> => HandlerTable::builder()
///             .on(Order::on_created)
///             .build())
///     }
/// }
/// ```
#[macro_export]
macro_rules! static_table {
    ($table:ty => $build:expr) => {{
        static TABLE: ::std::sync::OnceLock<
            ::std::result::Result<$table, $crate::error::DispatchError>,
        > = ::std::sync::OnceLock::new();
        TABLE
            .get_or_init(|| $build)
            .as_ref()
            .map_err(::std::clone::Clone::clone)
    }};
}

/// Implement [`EventSourced`](crate::dispatch::EventSourced) from lists of
/// appliers, inherited base types and child identifier types.
///
/// Sections must appear in this order; all but `appliers` are optional.
///
/// # Example
///
/// ```rust,ignore
/// use composable_aggregate_core::event_sourced;
///
/// event_sourced! {
///     Order {
///         appliers: [Order::on_created, Order::on_line_added],
///         fallible: [Order::on_line_removed],
///         inherit: [Audited => |order| &mut order.audit],
///         children: [LineId],
///     }
/// }
/// ```
#[macro_export]
macro_rules! event_sourced {
    (
        $target:ident {
            appliers: [$($applier:expr),* $(,)?]
            $(, fallible: [$($fallible:expr),* $(,)?])?
            $(, inherit: [$($base:ty => |$param:ident| $project:expr),* $(,)?])?
            $(, children: [$($child:ty),* $(,)?])?
            $(,)?
        }
    ) => {
        impl $crate::dispatch::EventSourced for $target {
            fn handlers() -> ::std::result::Result<
                &'static $crate::dispatch::HandlerTable<Self>,
                $crate::error::DispatchError,
            > {
                $crate::static_table!($crate::dispatch::HandlerTable<$target> => {
                    let builder = $crate::dispatch::HandlerTable::<$target>::builder()
                        $(.on($applier))*
                        $($(.try_on($fallible))*)?;
                    $($(
                        let builder = builder.inherit(
                            <$base as $crate::dispatch::EventSourced>::handlers(),
                            |$param: &mut $target| $project,
                        );
                    )*)?
                    builder.build()
                })
            }

            fn locators() -> ::std::result::Result<
                ::std::option::Option<&'static $crate::dispatch::LocatorTable<Self>>,
                $crate::error::DispatchError,
            > {
                $crate::static_table!($crate::dispatch::LocatorTable<$target> => {
                    let builder = $crate::dispatch::LocatorTable::<$target>::builder()
                        $($(.child::<$child>())*)?;
                    $($(
                        let builder = builder.inherit(
                            <$base as $crate::dispatch::EventSourced>::locators(),
                            |$param: &mut $target| $project,
                        );
                    )*)?
                    builder.build()
                })
                .map(::std::option::Option::Some)
            }
        }
    };
}
